//! Change projection from store diffs to per-consumer notifications.
//!
//! The projection itself is a pair of pure functions from (change batch,
//! registry snapshot) to routed per-consumer batches, kept side-effect free
//! so they can be tested without a store. [`spawn`] runs the dispatch task
//! that subscribes to the store's change streams and delivers the projected
//! batches through the registry.

use crate::store::{BalanceRecord, ChangeBatch, LedgerStore, TransactionRecord};
use crate::sync::registry::TokenRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The consumer a projected batch is destined for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Account,
    Token(String),
}

/// One consumer's view of a transaction change batch.
#[derive(Debug, Clone, Default)]
pub struct TransactionDiff {
    pub inserted: Vec<TransactionRecord>,
    pub updated: Vec<TransactionRecord>,
    pub deleted: Vec<String>,
}

/// Route a balance change batch: inserted and updated records go to the
/// account (by account address) or to the matching registered token;
/// records for unregistered addresses are dropped.
pub fn project_balances(
    batch: &ChangeBatch<BalanceRecord>,
    account_address: &str,
    tokens: &HashSet<String>,
) -> Vec<(Scope, BalanceRecord)> {
    batch
        .inserted
        .iter()
        .chain(batch.updated.iter())
        .filter_map(|record| {
            if record.address == account_address {
                Some((Scope::Account, record.clone()))
            } else if tokens.contains(&record.address) {
                Some((Scope::Token(record.address.clone()), record.clone()))
            } else {
                None
            }
        })
        .collect()
}

/// Partition a transaction change batch per consumer. Invalid rows are
/// excluded entirely; deletions are passed through to every notified
/// consumer as raw identifiers. A consumer appears in the result only when
/// its inserted or updated subset is non-empty.
pub fn project_transactions(
    batch: &ChangeBatch<TransactionRecord>,
    tokens: &HashSet<String>,
) -> Vec<(Scope, TransactionDiff)> {
    let select = |rows: &[TransactionRecord], contract: &str| -> Vec<TransactionRecord> {
        rows.iter()
            .filter(|tx| !tx.invalid && tx.contract_address == contract)
            .cloned()
            .collect()
    };

    let mut projected = Vec::new();
    let native = TransactionDiff {
        inserted: select(&batch.inserted, ""),
        updated: select(&batch.updated, ""),
        deleted: batch.deleted.clone(),
    };
    if !native.inserted.is_empty() || !native.updated.is_empty() {
        projected.push((Scope::Account, native));
    }

    for contract in tokens {
        let diff = TransactionDiff {
            inserted: select(&batch.inserted, contract),
            updated: select(&batch.updated, contract),
            deleted: batch.deleted.clone(),
        };
        if !diff.inserted.is_empty() || !diff.updated.is_empty() {
            projected.push((Scope::Token(contract.clone()), diff));
        }
    }
    projected
}

/// Spawn the dispatch task. It runs until the store's change streams close
/// or the shutdown signal flips.
pub fn spawn(
    store: Arc<dyn LedgerStore>,
    registry: Arc<TokenRegistry>,
    account_address: String,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut balances = store.subscribe_balances();
    let mut transactions = store.subscribe_transactions();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                batch = balances.recv() => match batch {
                    Ok(batch) => {
                        let tokens = registry.contract_addresses();
                        for (_, record) in project_balances(&batch, &account_address, &tokens) {
                            registry.apply_balance(&record);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("balance change stream lagged by {missed} batches");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                batch = transactions.recv() => match batch {
                    Ok(batch) => {
                        let tokens = registry.contract_addresses();
                        for (scope, diff) in project_transactions(&batch, &tokens) {
                            registry.notify_transactions(&scope, diff);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("transaction change stream lagged by {missed} batches");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => {
                    debug!("change projector shutting down");
                    break;
                }
            }
        }
    })
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

    fn transaction(contract: &str, invalid: bool) -> TransactionRecord {
        TransactionRecord {
            hash: "0x01".to_string(),
            from: "0xaaaa".to_string(),
            to: "0xbbbb".to_string(),
            contract_address: contract.to_string(),
            value: 1,
            gas_limit: 21_000,
            gas_price: 1,
            nonce: 0,
            block_number: 1,
            timestamp: 1,
            input: String::new(),
            invalid,
        }
    }

    #[test]
    fn balances_route_to_account_token_or_nowhere() {
        let tokens: HashSet<String> = ["0xtoken".to_string()].into();
        let batch = ChangeBatch {
            inserted: vec![balance("0xaccount", 1), balance("0xtoken", 2)],
            updated: vec![balance("0xstranger", 3)],
            deleted: vec![],
        };

        let projected = project_balances(&batch, "0xaccount", &tokens);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0].0, Scope::Account);
        assert_eq!(projected[1].0, Scope::Token("0xtoken".to_string()));
    }

    #[test]
    fn transactions_partition_by_contract_and_skip_invalid() {
        let tokens: HashSet<String> = ["0xtoken".to_string()].into();
        let batch = ChangeBatch {
            inserted: vec![
                transaction("", false),
                transaction("0xtoken", false),
                transaction("", true),
                transaction("0xother", false),
            ],
            updated: vec![],
            deleted: vec!["gone".to_string()],
        };

        let projected = project_transactions(&batch, &tokens);
        assert_eq!(projected.len(), 2);

        let (scope, native) = &projected[0];
        assert_eq!(*scope, Scope::Account);
        assert_eq!(native.inserted.len(), 1);
        assert_eq!(native.deleted, vec!["gone".to_string()]);

        let (scope, token) = &projected[1];
        assert_eq!(*scope, Scope::Token("0xtoken".to_string()));
        assert_eq!(token.inserted.len(), 1);
    }

    #[test]
    fn consumers_with_nothing_relevant_are_not_notified() {
        let tokens: HashSet<String> = ["0xtoken".to_string()].into();
        let batch = ChangeBatch {
            inserted: vec![transaction("", false)],
            updated: vec![],
            deleted: vec![],
        };
        let projected = project_transactions(&batch, &tokens);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].0, Scope::Account);

        // deletions alone notify nobody
        let batch: ChangeBatch<TransactionRecord> = ChangeBatch {
            deleted: vec!["gone".to_string()],
            ..ChangeBatch::default()
        };
        assert!(project_transactions(&batch, &tokens).is_empty());
    }
}
