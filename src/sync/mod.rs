//! Account Synchronization Module
//!
//! This module provides the core logic and services for keeping the local
//! ledger view consistent with the chain. It is composed of several
//! submodules, each responsible for a specific aspect of the sync process:
//!
//! - `coordinator`: the refresh state machine; drives one cycle at a time
//!   through the preamble fetch, the incremental transaction fetches, and
//!   the per-token balance fan-out.
//! - `registry`: the token registry; owns sync states, cached balance
//!   projections, and the listener handles everything is delivered through.
//! - `scheduler`: the periodic timer and reachability-transition trigger.
//! - `projector`: pure change projection from store diffs to per-consumer
//!   batches, plus the dispatch task.
//!
//! All state transitions funnel through the registry's lock, so sync cycles,
//! sends, and registry mutations never race; network calls themselves run
//! concurrently on the runtime's worker pool.

/// Refresh state machine
pub mod coordinator;
/// Change projection and dispatch
pub mod projector;
/// Token registry and listener fan-out
pub mod registry;
/// Periodic refresh scheduling
pub mod scheduler;

pub use coordinator::SyncCoordinator;
pub use projector::{Scope, TransactionDiff};
pub use registry::TokenRegistry;
pub use scheduler::RefreshScheduler;
