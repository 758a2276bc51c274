//!
//! Chain-data provider interface.
//!
//! The kit consumes chain state through the [`ChainProvider`] trait: block
//! height, gas price, address and token balances, transaction lists, the
//! pending nonce, and raw-payload broadcast. Implementations wrap whatever
//! JSON-RPC or indexer backend is available; their wire protocol and retry
//! behavior are outside the kit. Every call is independently failable and
//! the kit never retries on its own.

pub mod types;

pub use types::{ChainTransaction, ProviderError};

/// Asynchronous chain-data provider.
///
/// All methods may be called concurrently; the kit issues its preamble
/// fetches (height, gas price, native balance) in parallel within one
/// refresh cycle.
#[async_trait::async_trait]
pub trait ChainProvider: Send + Sync {
    /// Current chain head height.
    async fn block_height(&self) -> Result<u64, ProviderError>;

    /// Current network gas price in wei.
    async fn gas_price(&self) -> Result<u64, ProviderError>;

    /// Balance of `address` in the smallest unit. With `contract_address`
    /// set, the ERC-20 balance held at that contract; otherwise the native
    /// ETH balance.
    async fn balance(
        &self,
        address: &str,
        contract_address: Option<&str>,
    ) -> Result<u128, ProviderError>;

    /// Transactions involving `address` from `start_block` onwards.
    /// `token_scope` selects ERC-20 transfer events instead of plain
    /// transactions.
    async fn transactions(
        &self,
        address: &str,
        token_scope: bool,
        start_block: u64,
    ) -> Result<Vec<ChainTransaction>, ProviderError>;

    /// Next nonce for `address`, accounting for pending transactions.
    async fn pending_nonce(&self, address: &str) -> Result<u64, ProviderError>;

    /// Broadcast a signed payload, returning the chain-assigned transaction
    /// hash.
    async fn broadcast(&self, payload: &[u8]) -> Result<String, ProviderError>;
}
