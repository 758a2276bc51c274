/// Transfer construction, signing, and optimistic recording
pub mod builder;
/// ERC-20 call-data encoding
pub mod erc20;

pub use builder::{SendError, TransactionBuilder};

use serde::Serialize;

/// Decimal precision of the native coin.
pub const ETH_DECIMALS: u32 = 18;

/// Gas limit for a plain value transfer.
pub const ETH_GAS_LIMIT: u64 = 21_000;

/// Gas limit for an ERC-20 transfer; token transfers execute contract code
/// and cost more.
pub const ERC20_GAS_LIMIT: u64 = 100_000;

/// An unsigned transaction payload, handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    /// Destination: the recipient for native transfers, the token contract
    /// for ERC-20 transfers.
    pub to: String,
    /// Value in wei; zero for ERC-20 transfers (the amount travels in the
    /// call data).
    pub value: u128,
    pub gas_limit: u64,
    pub gas_price: u64,
    /// Call data, empty for native transfers.
    pub data: Vec<u8>,
}
