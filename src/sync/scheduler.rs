//! Periodic refresh scheduling.
//!
//! One background task ticks on a fixed interval and triggers the
//! coordinator, suppressing ticks while reachability is lost. A
//! reachability transition to reachable triggers an immediate refresh and
//! resets the tick phase; a transition to unreachable drops every unit to
//! `NotSynced` right away instead of waiting for the next tick.

use crate::sync::coordinator::SyncCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

pub struct RefreshScheduler {
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawn the scheduler task. The first tick fires one full interval
    /// after spawn; callers wanting an immediate refresh trigger one
    /// explicitly.
    pub fn spawn(
        coordinator: Arc<SyncCoordinator>,
        mut reachable: watch::Receiver<bool>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *reachable.borrow() {
                            debug!("periodic refresh tick");
                            coordinator.refresh();
                        } else {
                            debug!("suppressing refresh tick while unreachable");
                        }
                    }
                    changed = reachable.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *reachable.borrow() {
                            info!("network reachable again, refreshing");
                            coordinator.refresh();
                            ticker.reset();
                        } else {
                            info!("network reachability lost");
                            coordinator.connection_lost();
                        }
                    }
                }
            }
        });
        Self { handle }
    }

    /// Stop the periodic timer. Idempotent.
    pub fn invalidate(&self) {
        self.handle.abort();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
