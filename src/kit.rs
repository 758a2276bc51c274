//! Kit facade and integration point for all services.
//!
//! [`EthereumKit`] wires together the ledger store, chain provider, wallet,
//! token registry, sync coordinator, refresh scheduler, and change
//! projector, and exposes the public account surface: cached balance and
//! chain-head getters, fee estimators, send operations, token registration,
//! and transaction history queries.
//!
//! Construction restores the cached projections (balance, chain head) from
//! the store before any network call, so a freshly created kit reports the
//! last persisted view immediately. Teardown (`clear`) invalidates the
//! periodic timer, flips the instance-scoped shutdown signal that in-flight
//! work checks before touching shared state, detaches every token ledger,
//! and erases all persisted state.

use crate::provider::ChainProvider;
use crate::store::{LedgerStore, StoreError, TransactionRecord};
use crate::sync::{RefreshScheduler, SyncCoordinator, TokenRegistry, projector};
use crate::transaction::{SendError, TransactionBuilder};
use crate::types::{AccountListener, SyncState, TokenListener};
use crate::utils::{AddressError, validate_address};
use crate::wallet::Wallet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Kit configuration.
#[derive(Debug, Clone)]
pub struct KitConfig {
    /// Interval between periodic refresh cycles.
    pub refresh_interval: Duration,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
        }
    }
}

/// One account's synchronization and transaction-construction core.
///
/// Must be created inside a tokio runtime; the scheduler and change
/// projector run as background tasks scoped to the instance's lifetime.
pub struct EthereumKit {
    address: String,
    store: Arc<dyn LedgerStore>,
    registry: Arc<TokenRegistry>,
    coordinator: Arc<SyncCoordinator>,
    builder: TransactionBuilder,
    scheduler: RefreshScheduler,
    projector: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl EthereumKit {
    pub async fn new(
        wallet: Arc<dyn Wallet>,
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn LedgerStore>,
        listener: Arc<dyn AccountListener>,
        reachability: watch::Receiver<bool>,
        config: KitConfig,
    ) -> Result<Self, StoreError> {
        let address = wallet.address();
        let registry = Arc::new(TokenRegistry::new(address.clone(), listener));

        // Restore cached projections before anything touches the network.
        if let Some(record) = store.balance(&address).await? {
            registry.project_balance(&record);
        }
        if let Some(height) = store.block_height().await? {
            registry.set_last_block_height(height);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let coordinator = Arc::new(SyncCoordinator::new(
            address.clone(),
            provider.clone(),
            store.clone(),
            registry.clone(),
            reachability.clone(),
            shutdown_rx.clone(),
        ));
        let projector = projector::spawn(
            store.clone(),
            registry.clone(),
            address.clone(),
            shutdown_rx,
        );
        let scheduler =
            RefreshScheduler::spawn(coordinator.clone(), reachability, config.refresh_interval);
        let builder = TransactionBuilder::new(wallet, provider, store.clone());

        Ok(Self {
            address,
            store,
            registry,
            coordinator,
            builder,
            scheduler,
            projector,
            shutdown,
        })
    }

    /// The account's receive address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Cached ETH balance as an exact decimal string.
    pub fn balance(&self) -> String {
        self.registry.account_balance()
    }

    /// Last observed chain head height, if any.
    pub fn last_block_height(&self) -> Option<u64> {
        self.registry.last_block_height()
    }

    /// Current sync state of the account unit.
    pub fn sync_state(&self) -> SyncState {
        self.registry.account_state()
    }

    /// Kick off the first refresh cycle.
    pub fn start(&self) {
        self.refresh();
    }

    /// Trigger a refresh cycle; returns immediately. A no-op while another
    /// cycle is in flight or the network is unreachable.
    pub fn refresh(&self) {
        self.coordinator.refresh();
    }

    /// Validate the textual shape of an address.
    pub fn validate_address(&self, address: &str) -> Result<(), AddressError> {
        validate_address(address)
    }

    /// Upper-bound fee estimate for a plain value transfer, in ETH.
    pub async fn fee(&self) -> Result<String, StoreError> {
        self.builder.fee().await
    }

    /// Upper-bound fee estimate for an ERC-20 transfer, in ETH.
    pub async fn erc20_fee(&self) -> Result<String, StoreError> {
        self.builder.erc20_fee().await
    }

    /// Send `amount` ETH (a decimal string) to `to`, optionally overriding
    /// the cached gas price. On success the sent transaction is already
    /// recorded locally and appears in history before confirmation.
    pub async fn send(
        &self,
        to: &str,
        amount: &str,
        gas_price: Option<u64>,
    ) -> Result<TransactionRecord, SendError> {
        self.builder.send(to, amount, gas_price).await
    }

    /// Send `amount` (a decimal string in token units) of the registered
    /// token at `contract_address` to `to`. Fails with
    /// [`SendError::ContractNotRegistered`] before any network call when
    /// the contract is unknown.
    pub async fn send_erc20(
        &self,
        to: &str,
        contract_address: &str,
        amount: &str,
        gas_price: Option<u64>,
    ) -> Result<TransactionRecord, SendError> {
        let decimals = self
            .registry
            .token_decimals(contract_address)
            .ok_or_else(|| SendError::ContractNotRegistered(contract_address.to_string()))?;
        self.builder
            .send_erc20(to, contract_address, decimals, amount, gas_price)
            .await
    }

    /// Attach a token ledger. Idempotent per contract address: a second
    /// registration for the same contract is silently ignored. Any
    /// persisted balance for the contract is projected into the new
    /// ledger's cache immediately, before the triggered refresh completes.
    pub async fn register_token(&self, listener: Arc<dyn TokenListener>) -> Result<(), StoreError> {
        let contract = listener.contract_address();
        if !self.registry.register(listener) {
            debug!("token {contract} already registered");
            return Ok(());
        }
        if let Some(record) = self.store.balance(&contract).await? {
            self.registry.project_balance(&record);
        }
        self.refresh();
        Ok(())
    }

    /// Detach a token ledger. Persisted records are untouched; the account
    /// and other tokens are unaffected.
    pub fn unregister_token(&self, contract_address: &str) {
        self.registry.unregister(contract_address);
    }

    /// Cached balance of a registered token as an exact decimal string,
    /// `"0"` when unknown.
    pub fn erc20_balance(&self, contract_address: &str) -> String {
        self.registry.token_balance(contract_address)
    }

    /// Current sync state of a registered token's unit.
    pub fn erc20_sync_state(&self, contract_address: &str) -> Option<SyncState> {
        self.registry.token_state(contract_address)
    }

    /// Native transaction history, newest first. With `from_hash` set, only
    /// rows strictly older than the cursor row are returned.
    pub async fn transactions(
        &self,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.store.transactions(None, from_hash, limit).await
    }

    /// Transaction history of one token, newest first.
    pub async fn erc20_transactions(
        &self,
        contract_address: &str,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.store
            .transactions(Some(contract_address), from_hash, limit)
            .await
    }

    pub async fn debug_info(&self) -> String {
        format!(
            "ADDRESS: {}\nTRANSACTION COUNT: {}",
            self.address,
            self.store.transaction_count().await.unwrap_or(0)
        )
    }

    /// Tear the instance down: stop the periodic timer, discard in-flight
    /// work, detach every token ledger, and erase all persisted state.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.scheduler.invalidate();
        let _ = self.shutdown.send(true);
        self.registry.clear();
        self.store.clear().await
    }
}

impl Drop for EthereumKit {
    fn drop(&mut self) {
        self.scheduler.invalidate();
        self.projector.abort();
        let _ = self.shutdown.send(true);
    }
}
