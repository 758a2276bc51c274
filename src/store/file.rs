//! File-backed ledger store.
//!
//! A write-through JSON snapshot on top of [`MemoryLedgerStore`]: every
//! mutation updates the in-memory tables, then rewrites the snapshot file.
//! Opening the store restores the snapshot without publishing change
//! events. `clear` removes the file so a fresh open starts empty.

use super::memory::{MemoryLedgerStore, StoreSnapshot};
use super::{BalanceRecord, ChangeBatch, LedgerStore, StoreError, TransactionRecord};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;

pub struct FileLedgerStore {
    memory: MemoryLedgerStore,
    path: PathBuf,
}

impl FileLedgerStore {
    /// Open the store at `path`, restoring any existing snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let memory = MemoryLedgerStore::new();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                info!(
                    "restored ledger store from {:?}: {} balances, {} transactions",
                    path,
                    snapshot.balances.len(),
                    snapshot.transactions.len()
                );
                memory.restore(snapshot);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self { memory, path })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.memory.snapshot())?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerStore for FileLedgerStore {
    async fn balance(&self, address: &str) -> Result<Option<BalanceRecord>, StoreError> {
        self.memory.balance(address).await
    }

    async fn upsert_balance(&self, record: BalanceRecord) -> Result<(), StoreError> {
        self.memory.upsert_balance(record).await?;
        self.persist().await
    }

    async fn upsert_transactions(&self, records: Vec<TransactionRecord>) -> Result<(), StoreError> {
        self.memory.upsert_transactions(records).await?;
        self.persist().await
    }

    async fn insert_transaction_if_absent(
        &self,
        record: TransactionRecord,
    ) -> Result<bool, StoreError> {
        let inserted = self.memory.insert_transaction_if_absent(record).await?;
        if inserted {
            self.persist().await?;
        }
        Ok(inserted)
    }

    async fn transactions(
        &self,
        contract_address: Option<&str>,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.memory.transactions(contract_address, from_hash, limit).await
    }

    async fn transaction_count(&self) -> Result<usize, StoreError> {
        self.memory.transaction_count().await
    }

    async fn highest_block_number(&self, token_scope: bool) -> Result<u64, StoreError> {
        self.memory.highest_block_number(token_scope).await
    }

    async fn gas_price(&self) -> Result<u64, StoreError> {
        self.memory.gas_price().await
    }

    async fn set_gas_price(&self, wei: u64) -> Result<(), StoreError> {
        self.memory.set_gas_price(wei).await?;
        self.persist().await
    }

    async fn block_height(&self) -> Result<Option<u64>, StoreError> {
        self.memory.block_height().await
    }

    async fn set_block_height(&self, height: u64) -> Result<(), StoreError> {
        self.memory.set_block_height(height).await?;
        self.persist().await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.memory.clear().await?;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe_balances(&self) -> broadcast::Receiver<ChangeBatch<BalanceRecord>> {
        self.memory.subscribe_balances()
    }

    fn subscribe_transactions(&self) -> broadcast::Receiver<ChangeBatch<TransactionRecord>> {
        self.memory.subscribe_transactions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let store = FileLedgerStore::open(&path).await.unwrap();
        store
            .upsert_balance(BalanceRecord {
                address: "0xaaaa".to_string(),
                decimals: 18,
                value: 10u128.pow(18),
            })
            .await
            .unwrap();
        store.set_block_height(77).await.unwrap();
        drop(store);

        let reopened = FileLedgerStore::open(&path).await.unwrap();
        let record = reopened.balance("0xaaaa").await.unwrap().unwrap();
        assert_eq!(record.value, 10u128.pow(18));
        assert_eq!(reopened.block_height().await.unwrap(), Some(77));
    }

    #[tokio::test]
    async fn clear_removes_the_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let store = FileLedgerStore::open(&path).await.unwrap();
        store.set_gas_price(1).await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());

        let reopened = FileLedgerStore::open(&path).await.unwrap();
        assert_eq!(reopened.block_height().await.unwrap(), None);
    }
}
