//! In-memory ledger store.
//!
//! The canonical reference implementation of the [`LedgerStore`] contract:
//! plain hash maps behind a mutex, with change batches published on
//! `tokio::sync::broadcast` channels. The file-backed store wraps this one,
//! so the upsert and query semantics live here in one place.

use super::{BalanceRecord, ChangeBatch, DEFAULT_GAS_PRICE, LedgerStore, StoreError, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct Tables {
    balances: HashMap<String, BalanceRecord>,
    transactions: HashMap<String, TransactionRecord>,
    gas_price: Option<u64>,
    block_height: Option<u64>,
}

/// Serializable snapshot of the whole store, used by the file store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub balances: Vec<BalanceRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub gas_price: Option<u64>,
    pub block_height: Option<u64>,
}

/// In-memory [`LedgerStore`].
pub struct MemoryLedgerStore {
    tables: Mutex<Tables>,
    balance_events: broadcast::Sender<ChangeBatch<BalanceRecord>>,
    transaction_events: broadcast::Sender<ChangeBatch<TransactionRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        let (balance_events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (transaction_events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            balance_events,
            transaction_events,
        }
    }

    /// Copy out the full store contents.
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.lock().unwrap();
        StoreSnapshot {
            balances: tables.balances.values().cloned().collect(),
            transactions: tables.transactions.values().cloned().collect(),
            gas_price: tables.gas_price,
            block_height: tables.block_height,
        }
    }

    /// Replace the store contents from a snapshot without publishing change
    /// events; loading persisted state is not a change.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut tables = self.tables.lock().unwrap();
        tables.balances = snapshot
            .balances
            .into_iter()
            .map(|record| (record.address.clone(), record))
            .collect();
        tables.transactions = snapshot
            .transactions
            .into_iter()
            .map(|record| (record.primary(), record))
            .collect();
        tables.gas_price = snapshot.gas_price;
        tables.block_height = snapshot.block_height;
    }

    fn publish_balances(&self, batch: ChangeBatch<BalanceRecord>) {
        if !batch.is_empty() {
            let _ = self.balance_events.send(batch);
        }
    }

    fn publish_transactions(&self, batch: ChangeBatch<TransactionRecord>) {
        if !batch.is_empty() {
            let _ = self.transaction_events.send(batch);
        }
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn balance(&self, address: &str) -> Result<Option<BalanceRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().balances.get(address).cloned())
    }

    async fn upsert_balance(&self, record: BalanceRecord) -> Result<(), StoreError> {
        let batch = {
            let mut tables = self.tables.lock().unwrap();
            let mut batch = ChangeBatch::default();
            match tables.balances.insert(record.address.clone(), record.clone()) {
                None => batch.inserted.push(record),
                Some(previous) if previous != record => batch.updated.push(record),
                Some(_) => {}
            }
            batch
        };
        self.publish_balances(batch);
        Ok(())
    }

    async fn upsert_transactions(&self, records: Vec<TransactionRecord>) -> Result<(), StoreError> {
        let batch = {
            let mut tables = self.tables.lock().unwrap();
            let mut batch = ChangeBatch::default();
            for record in records {
                match tables.transactions.insert(record.primary(), record.clone()) {
                    None => batch.inserted.push(record),
                    Some(previous) if previous != record => batch.updated.push(record),
                    Some(_) => {}
                }
            }
            batch
        };
        self.publish_transactions(batch);
        Ok(())
    }

    async fn insert_transaction_if_absent(
        &self,
        record: TransactionRecord,
    ) -> Result<bool, StoreError> {
        let batch = {
            let mut tables = self.tables.lock().unwrap();
            let key = record.primary();
            if tables.transactions.contains_key(&key) {
                return Ok(false);
            }
            tables.transactions.insert(key, record.clone());
            ChangeBatch {
                inserted: vec![record],
                ..ChangeBatch::default()
            }
        };
        self.publish_transactions(batch);
        Ok(true)
    }

    async fn transactions(
        &self,
        contract_address: Option<&str>,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut rows: Vec<TransactionRecord> = {
            let tables = self.tables.lock().unwrap();
            tables
                .transactions
                .values()
                .filter(|tx| match contract_address {
                    None => tx.contract_address.is_empty() && !tx.invalid,
                    Some(contract) => tx.contract_address == contract,
                })
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(hash) = from_hash
            && let Some(cursor) = rows.iter().find(|tx| tx.hash == hash)
        {
            let cutoff = cursor.timestamp;
            rows.retain(|tx| tx.timestamp < cutoff);
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn transaction_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables.lock().unwrap().transactions.len())
    }

    async fn highest_block_number(&self, token_scope: bool) -> Result<u64, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .transactions
            .values()
            .filter(|tx| tx.is_token_transfer() == token_scope)
            .map(|tx| tx.block_number)
            .max()
            .unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().gas_price.unwrap_or(DEFAULT_GAS_PRICE))
    }

    async fn set_gas_price(&self, wei: u64) -> Result<(), StoreError> {
        self.tables.lock().unwrap().gas_price = Some(wei);
        Ok(())
    }

    async fn block_height(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.lock().unwrap().block_height)
    }

    async fn set_block_height(&self, height: u64) -> Result<(), StoreError> {
        self.tables.lock().unwrap().block_height = Some(height);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let (balance_batch, transaction_batch) = {
            let mut tables = self.tables.lock().unwrap();
            let balance_batch = ChangeBatch {
                deleted: tables.balances.keys().cloned().collect(),
                ..ChangeBatch::default()
            };
            let transaction_batch = ChangeBatch {
                deleted: tables.transactions.keys().cloned().collect(),
                ..ChangeBatch::default()
            };
            *tables = Tables::default();
            (balance_batch, transaction_batch)
        };
        self.publish_balances(balance_batch);
        self.publish_transactions(transaction_batch);
        Ok(())
    }

    fn subscribe_balances(&self) -> broadcast::Receiver<ChangeBatch<BalanceRecord>> {
        self.balance_events.subscribe()
    }

    fn subscribe_transactions(&self) -> broadcast::Receiver<ChangeBatch<TransactionRecord>> {
        self.transaction_events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(address: &str, value: u128) -> BalanceRecord {
        BalanceRecord {
            address: address.to_string(),
            decimals: 18,
            value,
        }
    }

    fn transaction(hash: &str, nonce: u64, timestamp: u64) -> TransactionRecord {
        TransactionRecord {
            hash: hash.to_string(),
            from: "0xaaaa".to_string(),
            to: "0xbbbb".to_string(),
            contract_address: String::new(),
            value: 100,
            gas_limit: 21_000,
            gas_price: 1,
            nonce,
            block_number: 0,
            timestamp,
            input: String::new(),
            invalid: false,
        }
    }

    #[tokio::test]
    async fn balance_upserts_keep_one_record_per_address() {
        let store = MemoryLedgerStore::new();
        for value in [1u128, 2, 3] {
            store.upsert_balance(balance("0xaaaa", value)).await.unwrap();
        }
        let record = store.balance("0xaaaa").await.unwrap().unwrap();
        assert_eq!(record.value, 3);
        assert_eq!(store.snapshot().balances.len(), 1);
    }

    #[tokio::test]
    async fn sent_and_confirmed_records_coalesce() {
        let store = MemoryLedgerStore::new();
        let sent = transaction("", 7, 1_000);
        assert!(store.insert_transaction_if_absent(sent.clone()).await.unwrap());
        assert!(!store.insert_transaction_if_absent(sent.clone()).await.unwrap());

        let mut confirmed = sent.clone();
        confirmed.hash = "0xdeadbeef".to_string();
        confirmed.block_number = 42;
        store.upsert_transactions(vec![confirmed]).await.unwrap();

        assert_eq!(store.transaction_count().await.unwrap(), 1);
        let rows = store.transactions(None, None, None).await.unwrap();
        assert_eq!(rows[0].block_number, 42);
        assert_eq!(rows[0].hash, "0xdeadbeef");
    }

    #[tokio::test]
    async fn upsert_emits_inserted_then_updated() {
        let store = MemoryLedgerStore::new();
        let mut events = store.subscribe_transactions();

        let tx = transaction("0x01", 1, 10);
        store.upsert_transactions(vec![tx.clone()]).await.unwrap();
        let batch = events.recv().await.unwrap();
        assert_eq!(batch.inserted.len(), 1);

        let mut confirmed = tx;
        confirmed.block_number = 5;
        store.upsert_transactions(vec![confirmed]).await.unwrap();
        let batch = events.recv().await.unwrap();
        assert_eq!(batch.updated.len(), 1);
        assert!(batch.inserted.is_empty());
    }

    #[tokio::test]
    async fn cursor_query_returns_strictly_older_rows() {
        let store = MemoryLedgerStore::new();
        let rows = vec![
            transaction("0x01", 1, 100),
            transaction("0x02", 2, 200),
            transaction("0x03", 3, 300),
            transaction("0x04", 4, 400),
        ];
        store.upsert_transactions(rows).await.unwrap();

        let page = store
            .transactions(None, Some("0x03"), Some(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].hash, "0x02");
    }

    #[tokio::test]
    async fn native_query_excludes_invalid_and_token_rows() {
        let store = MemoryLedgerStore::new();
        let mut invalid = transaction("0x01", 1, 100);
        invalid.invalid = true;
        let mut token = transaction("0x02", 2, 200);
        token.contract_address = "0xcccc".to_string();
        let native = transaction("0x03", 3, 300);
        store
            .upsert_transactions(vec![invalid, token.clone(), native])
            .await
            .unwrap();

        let rows = store.transactions(None, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hash, "0x03");

        let rows = store.transactions(Some("0xcccc"), None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hash, "0x02");
    }

    #[tokio::test]
    async fn highest_block_number_is_per_scope() {
        let store = MemoryLedgerStore::new();
        let mut native = transaction("0x01", 1, 100);
        native.block_number = 90;
        let mut token = transaction("0x02", 2, 200);
        token.contract_address = "0xcccc".to_string();
        token.block_number = 120;
        store.upsert_transactions(vec![native, token]).await.unwrap();

        assert_eq!(store.highest_block_number(false).await.unwrap(), 90);
        assert_eq!(store.highest_block_number(true).await.unwrap(), 120);
        let empty = MemoryLedgerStore::new();
        assert_eq!(empty.highest_block_number(false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn gas_price_reads_through_to_the_floor() {
        let store = MemoryLedgerStore::new();
        assert_eq!(store.gas_price().await.unwrap(), DEFAULT_GAS_PRICE);
        // the floor read must not be written back
        assert_eq!(store.snapshot().gas_price, None);

        store.set_gas_price(1).await.unwrap();
        assert_eq!(store.gas_price().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_erases_everything_and_reports_deletions() {
        let store = MemoryLedgerStore::new();
        store.upsert_balance(balance("0xaaaa", 1)).await.unwrap();
        store
            .upsert_transactions(vec![transaction("0x01", 1, 100)])
            .await
            .unwrap();
        store.set_block_height(10).await.unwrap();

        let mut events = store.subscribe_transactions();
        store.clear().await.unwrap();

        assert_eq!(store.transaction_count().await.unwrap(), 0);
        assert_eq!(store.balance("0xaaaa").await.unwrap(), None);
        assert_eq!(store.block_height().await.unwrap(), None);
        let batch = events.recv().await.unwrap();
        assert_eq!(batch.deleted.len(), 1);
    }
}
