//! Shared kit types: synchronization states and consumer listener traits.

use crate::store::TransactionRecord;

/// Synchronization state of the account or of one registered token ledger.
///
/// Every unit starts in `NotSynced`, moves to `Syncing` when a refresh cycle
/// begins, and ends in `Synced` or back in `NotSynced` depending on the
/// outcome. The machine is cyclic; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NotSynced,
    Syncing,
    Synced,
}

/// Consumer of account-level updates.
///
/// The account owner implements this to observe balance changes, transaction
/// history changes, chain head movement, and sync state transitions. All
/// methods are invoked from the kit's background tasks after the internal
/// state lock has been released, so implementations may call back into the
/// kit.
pub trait AccountListener: Send + Sync {
    /// The balance changed; `balance` is an exact decimal string in the
    /// unit's own precision (ETH for the account, token units for a token).
    fn balance_updated(&self, balance: String);

    /// The transaction history changed. `inserted` and `updated` carry only
    /// rows relevant to this consumer; `deleted` carries raw record
    /// identifiers. Delivered once per change batch, never per row.
    fn transactions_updated(
        &self,
        inserted: Vec<TransactionRecord>,
        updated: Vec<TransactionRecord>,
        deleted: Vec<String>,
    );

    /// A new chain head height was observed.
    fn last_block_height_updated(&self, height: u64);

    /// The unit's sync state changed.
    fn sync_state_updated(&self, state: SyncState);
}

/// Consumer of updates for one registered ERC-20 token ledger.
///
/// Besides receiving notifications, the listener supplies the token's
/// registry identity: its contract address and decimal precision.
pub trait TokenListener: AccountListener {
    /// The token contract address, unique within the registry.
    fn contract_address(&self) -> String;

    /// The token's decimal precision, used to scale amounts.
    fn decimals(&self) -> u32;
}
