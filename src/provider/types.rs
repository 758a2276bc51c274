//! Wire types for the chain-data provider.

use serde::{Deserialize, Serialize};

/// A transaction as reported by the chain-data provider.
///
/// Token-scoped fetches report ERC-20 transfers with `contract_address` set
/// and `value` in token units; native fetches leave `contract_address`
/// empty and report wei.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    /// The chain-assigned transaction hash.
    pub hash: String,
    /// Sender address.
    pub from: String,
    /// Recipient address (for token transfers, the token recipient).
    pub to: String,
    /// Token contract address, empty for native transfers.
    #[serde(default)]
    pub contract_address: String,
    /// Transferred value in the smallest unit of its scope.
    pub value: u128,
    /// Gas limit the transaction was submitted with.
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Block timestamp, seconds since the epoch.
    pub timestamp: u64,
    /// Call data as a 0x-prefixed hex string, empty if none.
    #[serde(default)]
    pub input: String,
    /// Whether the chain reports the execution as failed.
    #[serde(default)]
    pub failed: bool,
}

/// Error types for chain-provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),
}
