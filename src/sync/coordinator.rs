//! Refresh state machine.
//!
//! The coordinator decides when a refresh may run and drives the cycle:
//! connectivity gate, mutual exclusion across the whole account, the
//! three-way preamble fetch (chain head, gas price, native balance), the
//! incremental per-scope transaction fetches, and the per-token balance
//! fan-out. `refresh()` returns immediately after dispatching; completion
//! is observable only through sync state transitions and listener
//! notifications, never as an error to the caller.

use crate::provider::ChainProvider;
use crate::store::{BalanceRecord, LedgerStore, TransactionRecord};
use crate::sync::registry::TokenRegistry;
use crate::transaction::ETH_DECIMALS;
use crate::types::SyncState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct SyncCoordinator {
    address: String,
    provider: Arc<dyn ChainProvider>,
    store: Arc<dyn LedgerStore>,
    registry: Arc<TokenRegistry>,
    reachable: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
}

impl SyncCoordinator {
    pub fn new(
        address: String,
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn LedgerStore>,
        registry: Arc<TokenRegistry>,
        reachable: watch::Receiver<bool>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            address,
            provider,
            store,
            registry,
            reachable,
            shutdown,
        }
    }

    /// Dispatch a refresh cycle and return immediately.
    pub fn refresh(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_cycle().await;
        });
    }

    /// Network reachability was lost: every unit drops to `NotSynced`.
    pub fn connection_lost(&self) {
        self.registry.set_all_states(SyncState::NotSynced);
    }

    fn is_reachable(&self) -> bool {
        *self.reachable.borrow()
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run_cycle(&self) {
        if !self.is_reachable() {
            debug!("network unreachable, marking all ledgers not synced");
            self.registry.set_all_states(SyncState::NotSynced);
            return;
        }
        if !self.registry.begin_refresh() {
            debug!("refresh already in flight, skipping");
            return;
        }
        info!("starting refresh cycle for {}", self.address);

        // Shared preamble: all three must succeed or nothing is merged.
        let preamble = tokio::try_join!(
            self.provider.block_height(),
            self.provider.gas_price(),
            self.provider.balance(&self.address, None),
        );
        let (height, gas_price, balance) = match preamble {
            Ok(values) => values,
            Err(e) => {
                warn!("refresh preamble failed: {e}");
                self.registry.set_all_states(SyncState::NotSynced);
                return;
            }
        };
        if self.is_closed() {
            self.registry.set_all_states(SyncState::NotSynced);
            return;
        }

        if let Err(e) = self.store.set_block_height(height).await {
            warn!("failed to persist block height: {e}");
        }
        self.registry.notify_block_height(height);
        if let Err(e) = self.store.set_gas_price(gas_price).await {
            warn!("failed to persist gas price: {e}");
        }
        let record = BalanceRecord {
            address: self.address.clone(),
            decimals: ETH_DECIMALS,
            value: balance,
        };
        if let Err(e) = self.store.upsert_balance(record).await {
            warn!("failed to persist native balance: {e}");
        }

        self.refresh_transactions().await;
        info!("refresh cycle finished for {}", self.address);
    }

    /// Fetch new transactions for both scopes, each picking up after the
    /// highest block it has already recorded. The native and token fetches
    /// run concurrently; the per-token balance refresh only starts once the
    /// token-scope merge is done.
    async fn refresh_transactions(&self) {
        let native = async {
            let start = self.start_block(false).await;
            match self.provider.transactions(&self.address, false, start).await {
                Ok(transactions) => {
                    // shut down mid-fetch: drop the result, never repopulate
                    if self.is_closed() {
                        self.registry.set_account_state(SyncState::NotSynced);
                        return;
                    }
                    debug!("fetched {} native transactions", transactions.len());
                    self.merge_transactions(transactions).await;
                    self.registry.set_account_state(SyncState::Synced);
                }
                Err(e) => {
                    warn!("native transaction fetch failed: {e}");
                    self.registry.set_account_state(SyncState::NotSynced);
                }
            }
        };

        let token = async {
            if !self.registry.has_tokens() {
                return;
            }
            let start = self.start_block(true).await;
            match self.provider.transactions(&self.address, true, start).await {
                Ok(transactions) => {
                    if self.is_closed() {
                        self.registry.set_token_states(SyncState::NotSynced);
                        return;
                    }
                    debug!("fetched {} token transactions", transactions.len());
                    self.merge_transactions(transactions).await;
                    self.refresh_token_balances().await;
                }
                Err(e) => {
                    warn!("token transaction fetch failed: {e}");
                    self.registry.set_token_states(SyncState::NotSynced);
                }
            }
        };

        tokio::join!(native, token);
    }

    async fn start_block(&self, token_scope: bool) -> u64 {
        match self.store.highest_block_number(token_scope).await {
            Ok(highest) => highest + 1,
            Err(e) => {
                warn!("failed to read highest block number: {e}");
                1
            }
        }
    }

    async fn merge_transactions(&self, transactions: Vec<crate::provider::ChainTransaction>) {
        let records: Vec<TransactionRecord> =
            transactions.into_iter().map(TransactionRecord::from).collect();
        if let Err(e) = self.store.upsert_transactions(records).await {
            warn!("failed to persist transactions: {e}");
        }
    }

    /// One concurrent balance fetch per registered token; each token's
    /// outcome is independent of the others.
    async fn refresh_token_balances(&self) {
        let fetches = self.registry.contracts().into_iter().map(|(contract, decimals)| {
            async move {
                match self.provider.balance(&self.address, Some(&contract)).await {
                    Ok(value) => {
                        if self.is_closed() {
                            self.registry.set_token_state(&contract, SyncState::NotSynced);
                            return;
                        }
                        let record = BalanceRecord {
                            address: contract.clone(),
                            decimals,
                            value,
                        };
                        if let Err(e) = self.store.upsert_balance(record).await {
                            warn!("failed to persist balance for {contract}: {e}");
                        }
                        self.registry.set_token_state(&contract, SyncState::Synced);
                    }
                    Err(e) => {
                        warn!("balance fetch failed for {contract}: {e}");
                        self.registry.set_token_state(&contract, SyncState::NotSynced);
                    }
                }
            }
        });
        futures::future::join_all(fetches).await;
    }
}
