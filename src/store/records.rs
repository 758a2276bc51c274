//! Persisted record types.

use crate::provider::ChainTransaction;
use serde::{Deserialize, Serialize};

/// One persisted balance, keyed by owner address.
///
/// The owner address is either the account address (native ETH balance,
/// 18 decimals) or a token contract address (that token's balance in its
/// own precision). At most one live record exists per address; writes are
/// upserts on this key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: String,
    pub decimals: u32,
    /// Raw magnitude in the smallest unit.
    pub value: u128,
}

/// One persisted transaction, native or token-scoped.
///
/// Uniqueness is enforced on [`TransactionRecord::primary`], not on the
/// chain hash: a transfer is recorded locally the moment it is broadcast,
/// before any hash-bearing confirmation exists, and the later confirmed row
/// from the provider must coalesce with it instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Chain-assigned transaction hash.
    pub hash: String,
    /// Sender address.
    pub from: String,
    /// Recipient address (token recipient for token transfers).
    pub to: String,
    /// Token contract address, empty for native transfers.
    #[serde(default)]
    pub contract_address: String,
    /// Transferred value in the smallest unit of its scope.
    pub value: u128,
    pub gas_limit: u64,
    pub gas_price: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Block the transaction was confirmed in; 0 while unconfirmed.
    #[serde(default)]
    pub block_number: u64,
    /// Seconds since the epoch.
    pub timestamp: u64,
    /// Call data as a 0x-prefixed hex string, empty if none.
    #[serde(default)]
    pub input: String,
    /// Set when the chain reports the execution as failed.
    #[serde(default)]
    pub invalid: bool,
}

impl TransactionRecord {
    /// The content-identity key: deterministic over the fields known at
    /// send time, independent of the chain hash.
    pub fn primary(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.from, self.to, self.value, self.nonce, self.contract_address
        )
    }

    pub fn is_token_transfer(&self) -> bool {
        !self.contract_address.is_empty()
    }
}

impl From<ChainTransaction> for TransactionRecord {
    fn from(tx: ChainTransaction) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            contract_address: tx.contract_address,
            value: tx.value,
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            nonce: tx.nonce,
            block_number: tx.block_number,
            timestamp: tx.timestamp,
            input: tx.input,
            invalid: tx.failed,
        }
    }
}
