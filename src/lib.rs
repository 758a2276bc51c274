//! Ethereum account synchronization and transaction kit.
//!
//! This crate keeps a persisted local view of one account's ETH balance, any
//! number of registered ERC-20 token balances, and the transaction history
//! for each, consistent with a remote chain-data provider. On top of that
//! view it constructs, signs, and broadcasts outgoing transfers, recording
//! them optimistically so they appear in history before the chain confirms
//! them.
//!
//! The crate is organized around a small set of services wired together by
//! [`EthereumKit`]:
//!
//! - `provider`: the chain-data provider interface (block height, gas price,
//!   balances, transaction lists, nonce, broadcast)
//! - `store`: the ledger store contract, persisted record types, and the
//!   bundled in-memory and file-backed implementations
//! - `sync`: the refresh state machine, token registry, periodic scheduler,
//!   and change projection
//! - `transaction`: transfer construction, signing, and fee estimation
//! - `wallet`: the signing capability interface
//!
//! Network calls run concurrently on the runtime's worker pool; all state
//! transitions and listener notifications are serialized through the token
//! registry, so a sync cycle and a concurrent send never race.

pub mod kit;
pub mod provider;
pub mod store;
pub mod sync;
pub mod transaction;
pub mod types;
pub mod utils;
pub mod wallet;

pub use kit::{EthereumKit, KitConfig};
pub use types::{AccountListener, SyncState, TokenListener};
