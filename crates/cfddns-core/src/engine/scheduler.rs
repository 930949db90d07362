//! Polling loop
//!
//! Runs reconciliation cycles back to back, sleeping for an interval drawn
//! from an [`IntervalPolicy`] in between. A cycle always runs to completion;
//! shutdown is only observed while sleeping, so no record is left half
//! written.

use super::{CycleReport, Reconciler};
use crate::interval::IntervalPolicy;
use std::future::Future;
use tracing::{debug, info};

/// Discover → reconcile → sleep, until shutdown
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Box<dyn IntervalPolicy>,
}

impl Scheduler {
    /// Create a scheduler around `reconciler`
    pub fn new(reconciler: Reconciler, interval: impl IntervalPolicy + 'static) -> Self {
        Self {
            reconciler,
            interval: Box::new(interval),
        }
    }

    /// The wrapped reconciler
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run until `shutdown` completes
    ///
    /// Returns the number of completed cycles.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> u64 {
        self.run_observed(shutdown, |_| {}).await
    }

    /// Run until `shutdown` completes, handing every cycle's report to
    /// `observe`
    ///
    /// Returns the number of completed cycles.
    pub async fn run_observed(
        &mut self,
        shutdown: impl Future<Output = ()>,
        mut observe: impl FnMut(&CycleReport),
    ) -> u64 {
        tokio::pin!(shutdown);

        info!(
            "Starting reconciliation loop for {} record(s)",
            self.reconciler.registry().len()
        );

        let mut cycles = 0u64;
        loop {
            let report = self.reconciler.run_cycle().await;
            cycles += 1;
            observe(&report);

            let pause = self.interval.next_interval();
            info!("Sleeping for {:?}", pause);

            tokio::select! {
                _ = tokio::time::sleep(pause) => {
                    debug!("Woke up for cycle {}", cycles + 1);
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received after {} cycle(s)", cycles);
                    break;
                }
            }
        }

        cycles
    }
}
