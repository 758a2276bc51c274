//!
//! Ledger store contract and bundled implementations.
//!
//! The store is the single shared mutable resource of the kit: four logical
//! collections (balances keyed by owner address, transactions keyed by
//! content identity, and the gas-price and block-height singletons) plus
//! change-notification streams that feed the change projector. All
//! mutations are upserts guarded by a unique-key constraint, so overlapping
//! writers are safe by construction: newer data wins, duplicate content is
//! a no-op.
//!
//! Two implementations ship with the crate: [`MemoryLedgerStore`] for tests
//! and ephemeral use, and [`FileLedgerStore`], a write-through JSON snapshot
//! on top of it.

pub mod file;
pub mod memory;
pub mod records;

pub use file::FileLedgerStore;
pub use memory::MemoryLedgerStore;
pub use records::{BalanceRecord, TransactionRecord};

use tokio::sync::broadcast;

/// Gas price floor in wei, used when no observed price has been persisted
/// yet (10 Gwei).
pub const DEFAULT_GAS_PRICE: u64 = 10_000_000_000;

/// One batch of changes to a store collection, diffed by kind.
///
/// `deleted` carries raw record identifiers (balance addresses or
/// transaction content keys).
#[derive(Debug, Clone)]
pub struct ChangeBatch<T> {
    pub inserted: Vec<T>,
    pub updated: Vec<T>,
    pub deleted: Vec<String>,
}

impl<T> ChangeBatch<T> {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

// Manual impl: an empty batch needs no `T: Default`, which the record types
// do not provide.
impl<T> Default for ChangeBatch<T> {
    fn default() -> Self {
        Self {
            inserted: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

/// Error types for local persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The persistence contract the kit requires.
///
/// Writes are upserts on the record's identity key. Change streams deliver
/// batched diffs, one batch per mutating call that changed anything.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// The live balance record for an owner address, if any.
    async fn balance(&self, address: &str) -> Result<Option<BalanceRecord>, StoreError>;

    /// Insert or replace the balance record for its address.
    async fn upsert_balance(&self, record: BalanceRecord) -> Result<(), StoreError>;

    /// Insert or replace transaction records by content identity.
    async fn upsert_transactions(&self, records: Vec<TransactionRecord>) -> Result<(), StoreError>;

    /// Insert a transaction record only if no record with the same content
    /// identity exists. Returns whether the record was inserted.
    async fn insert_transaction_if_absent(
        &self,
        record: TransactionRecord,
    ) -> Result<bool, StoreError>;

    /// Query transactions newest-first. `contract_address` of `None`
    /// selects valid native transfers; `Some(addr)` selects that token's
    /// transfers. With `from_hash` set, only rows strictly older (by
    /// timestamp) than the cursor row are returned. `limit` truncates the
    /// result.
    async fn transactions(
        &self,
        contract_address: Option<&str>,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Total number of stored transaction rows.
    async fn transaction_count(&self) -> Result<usize, StoreError>;

    /// Highest confirmed block number recorded for the given scope, 0 if
    /// none.
    async fn highest_block_number(&self, token_scope: bool) -> Result<u64, StoreError>;

    /// The cached gas price, or [`DEFAULT_GAS_PRICE`] if none was ever
    /// observed. Reading never writes the default back.
    async fn gas_price(&self) -> Result<u64, StoreError>;

    async fn set_gas_price(&self, wei: u64) -> Result<(), StoreError>;

    /// The last observed chain head height, if any.
    async fn block_height(&self) -> Result<Option<u64>, StoreError>;

    async fn set_block_height(&self, height: u64) -> Result<(), StoreError>;

    /// Erase all persisted state as one atomic operation.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Subscribe to balance change batches.
    fn subscribe_balances(&self) -> broadcast::Receiver<ChangeBatch<BalanceRecord>>;

    /// Subscribe to transaction change batches.
    fn subscribe_transactions(&self) -> broadcast::Receiver<ChangeBatch<TransactionRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_is_empty_for_any_record_type() {
        assert!(ChangeBatch::<BalanceRecord>::default().is_empty());
        assert!(ChangeBatch::<TransactionRecord>::default().is_empty());
    }
}
