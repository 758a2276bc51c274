//! Token registry and listener fan-out.
//!
//! The registry is the serialized core of the kit: it owns the account's
//! sync state and cached balance, one ledger per registered token, and the
//! listener handles updates are delivered through. Every state transition
//! and cache mutation goes through its mutex, which is what makes a sync
//! cycle and a concurrent send safe against each other. Listener callbacks
//! are collected under the guard and invoked after it is dropped, so a
//! listener may call back into the kit.

use crate::store::BalanceRecord;
use crate::sync::projector::{Scope, TransactionDiff};
use crate::types::{AccountListener, SyncState, TokenListener};
use crate::utils::format_token_amount;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

struct TokenLedger {
    listener: Arc<dyn TokenListener>,
    decimals: u32,
    state: SyncState,
    balance: String,
}

struct RegistryInner {
    address: String,
    listener: Arc<dyn AccountListener>,
    state: SyncState,
    balance: String,
    last_block_height: Option<u64>,
    tokens: HashMap<String, TokenLedger>,
}

pub struct TokenRegistry {
    inner: Mutex<RegistryInner>,
}

/// A state notification captured under the lock, delivered after it.
type StateNotification = (Arc<dyn AccountListener>, SyncState);

fn deliver(notifications: Vec<StateNotification>) {
    for (listener, state) in notifications {
        listener.sync_state_updated(state);
    }
}

impl TokenRegistry {
    pub fn new(address: String, listener: Arc<dyn AccountListener>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                address,
                listener,
                state: SyncState::NotSynced,
                balance: "0".to_string(),
                last_block_height: None,
                tokens: HashMap::new(),
            }),
        }
    }

    /// Attach a token ledger. Returns `false` (and changes nothing) if a
    /// ledger for the contract address already exists.
    pub fn register(&self, listener: Arc<dyn TokenListener>) -> bool {
        let contract = listener.contract_address();
        let decimals = listener.decimals();
        let mut inner = self.inner.lock().unwrap();
        if inner.tokens.contains_key(&contract) {
            return false;
        }
        debug!("registering token ledger {contract}");
        inner.tokens.insert(
            contract,
            TokenLedger {
                listener,
                decimals,
                state: SyncState::NotSynced,
                balance: "0".to_string(),
            },
        );
        true
    }

    /// Detach a token ledger. Persisted records are untouched, so
    /// re-registration recovers prior state without a network round trip.
    pub fn unregister(&self, contract_address: &str) {
        self.inner.lock().unwrap().tokens.remove(contract_address);
    }

    /// Detach every token ledger.
    pub fn clear(&self) {
        self.inner.lock().unwrap().tokens.clear();
    }

    pub fn has_tokens(&self) -> bool {
        !self.inner.lock().unwrap().tokens.is_empty()
    }

    /// Contract address and decimals of every registered token.
    pub fn contracts(&self) -> Vec<(String, u32)> {
        let inner = self.inner.lock().unwrap();
        inner
            .tokens
            .iter()
            .map(|(contract, ledger)| (contract.clone(), ledger.decimals))
            .collect()
    }

    pub fn contract_addresses(&self) -> HashSet<String> {
        self.inner.lock().unwrap().tokens.keys().cloned().collect()
    }

    pub fn token_decimals(&self, contract_address: &str) -> Option<u32> {
        let inner = self.inner.lock().unwrap();
        inner.tokens.get(contract_address).map(|ledger| ledger.decimals)
    }

    /// Begin a refresh cycle: if the account or any token is already
    /// `Syncing` nothing changes and `false` is returned; otherwise every
    /// unit transitions to `Syncing` atomically before the caller issues
    /// any network call.
    pub fn begin_refresh(&self) -> bool {
        let notifications = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SyncState::Syncing
                || inner.tokens.values().any(|ledger| ledger.state == SyncState::Syncing)
            {
                return false;
            }
            set_all(&mut inner, SyncState::Syncing)
        };
        deliver(notifications);
        true
    }

    /// Transition every unit (account and tokens) to `state`.
    pub fn set_all_states(&self, state: SyncState) {
        let notifications = {
            let mut inner = self.inner.lock().unwrap();
            set_all(&mut inner, state)
        };
        deliver(notifications);
    }

    /// Transition every token unit to `state`, leaving the account alone.
    pub fn set_token_states(&self, state: SyncState) {
        let notifications: Vec<StateNotification> = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .tokens
                .values_mut()
                .map(|ledger| {
                    ledger.state = state;
                    (listener_of(ledger), state)
                })
                .collect()
        };
        deliver(notifications);
    }

    pub fn set_account_state(&self, state: SyncState) {
        let listener = {
            let mut inner = self.inner.lock().unwrap();
            inner.state = state;
            inner.listener.clone()
        };
        listener.sync_state_updated(state);
    }

    pub fn set_token_state(&self, contract_address: &str, state: SyncState) {
        let listener = {
            let mut inner = self.inner.lock().unwrap();
            match inner.tokens.get_mut(contract_address) {
                Some(ledger) => {
                    ledger.state = state;
                    listener_of(ledger)
                }
                None => return,
            }
        };
        listener.sync_state_updated(state);
    }

    pub fn account_state(&self) -> SyncState {
        self.inner.lock().unwrap().state
    }

    pub fn token_state(&self, contract_address: &str) -> Option<SyncState> {
        let inner = self.inner.lock().unwrap();
        inner.tokens.get(contract_address).map(|ledger| ledger.state)
    }

    pub fn account_balance(&self) -> String {
        self.inner.lock().unwrap().balance.clone()
    }

    /// Cached decimal balance of a registered token, `"0"` when unknown.
    pub fn token_balance(&self, contract_address: &str) -> String {
        let inner = self.inner.lock().unwrap();
        inner
            .tokens
            .get(contract_address)
            .map(|ledger| ledger.balance.clone())
            .unwrap_or_else(|| "0".to_string())
    }

    /// Refresh the cached decimal projection of a balance record without
    /// notifying anyone; used when restoring persisted state.
    pub fn project_balance(&self, record: &BalanceRecord) {
        let _ = self.route_balance(record);
    }

    /// Refresh the cached projection and notify the owning listener.
    /// Records for unregistered addresses are dropped silently.
    pub fn apply_balance(&self, record: &BalanceRecord) {
        if let Some((listener, decimal)) = self.route_balance(record) {
            listener.balance_updated(decimal);
        }
    }

    fn route_balance(
        &self,
        record: &BalanceRecord,
    ) -> Option<(Arc<dyn AccountListener>, String)> {
        let decimal = format_token_amount(record.value, record.decimals);
        let mut inner = self.inner.lock().unwrap();
        if record.address == inner.address {
            inner.balance = decimal.clone();
            Some((inner.listener.clone(), decimal))
        } else if let Some(ledger) = inner.tokens.get_mut(&record.address) {
            ledger.balance = decimal.clone();
            Some((listener_of(ledger), decimal))
        } else {
            debug!("dropping balance for unregistered address {}", record.address);
            None
        }
    }

    /// Record a new chain head and notify the account and every token.
    pub fn notify_block_height(&self, height: u64) {
        let listeners: Vec<Arc<dyn AccountListener>> = {
            let mut inner = self.inner.lock().unwrap();
            inner.last_block_height = Some(height);
            std::iter::once(inner.listener.clone())
                .chain(inner.tokens.values().map(listener_of))
                .collect()
        };
        for listener in listeners {
            listener.last_block_height_updated(height);
        }
    }

    pub fn last_block_height(&self) -> Option<u64> {
        self.inner.lock().unwrap().last_block_height
    }

    /// Seed the cached chain head from persisted state, without notifying.
    pub fn set_last_block_height(&self, height: u64) {
        self.inner.lock().unwrap().last_block_height = Some(height);
    }

    /// Deliver one projected transaction diff to its consumer.
    pub fn notify_transactions(&self, scope: &Scope, diff: TransactionDiff) {
        let listener: Option<Arc<dyn AccountListener>> = {
            let inner = self.inner.lock().unwrap();
            match scope {
                Scope::Account => Some(inner.listener.clone()),
                Scope::Token(contract) => inner.tokens.get(contract).map(listener_of),
            }
        };
        if let Some(listener) = listener {
            listener.transactions_updated(diff.inserted, diff.updated, diff.deleted);
        }
    }
}

fn listener_of(ledger: &TokenLedger) -> Arc<dyn AccountListener> {
    let listener: Arc<dyn AccountListener> = ledger.listener.clone();
    listener
}

fn set_all(inner: &mut RegistryInner, state: SyncState) -> Vec<StateNotification> {
    inner.state = state;
    let mut notifications: Vec<StateNotification> = vec![(inner.listener.clone(), state)];
    for ledger in inner.tokens.values_mut() {
        ledger.state = state;
        notifications.push((listener_of(ledger), state));
    }
    notifications
}
