//! Reconciliation engine
//!
//! The [`Reconciler`] runs one cycle at a time:
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │─── current() ───┐
//! └─────────────┘                 │
//!                                 ▼
//!                        ┌──────────────┐
//!                        │  Reconciler  │
//!                        └──────────────┘
//!                                 │  one task per record (JoinSet)
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//! ┌──────────────┐       ┌──────────────┐       ┌──────────────┐
//! │ Synchronizer │       │ Synchronizer │       │ Synchronizer │
//! │  record #1   │       │  record #2   │       │  record #n   │
//! └──────────────┘       └──────────────┘       └──────────────┘
//!         └───────────────────────┼───────────────────────┘
//!                                 ▼
//!                           CycleReport
//! ```
//!
//! The [`Scheduler`] wraps the reconciler in the discover → reconcile →
//! sleep loop.
//!
//! ## Failure isolation
//!
//! 1. Discovery failure: the cycle is skipped, no record is touched
//! 2. Record failure: logged with the hostname; other records still run
//! 3. Task panic: logged; that record keeps its previous state
//!
//! Nothing in a cycle stops the loop.

mod scheduler;

pub use scheduler::Scheduler;

use crate::error::{Error, Result};
use crate::registry::{ManagedRecord, RecordRegistry};
use crate::sync::{SyncOutcome, Synchronizer};
use crate::traits::IpSource;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Result for one record within a cycle
#[derive(Debug)]
pub struct RecordReport {
    /// Hostname of the record
    pub hostname: String,
    /// What the synchronizer did, or why it failed
    pub result: Result<SyncOutcome>,
}

/// Summary of one reconciliation cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Address discovered this cycle (`None` if discovery failed)
    pub discovered_ip: Option<Ipv4Addr>,

    /// Why discovery failed, if it did
    pub discovery_error: Option<Error>,

    /// Per-record results, in registry order
    pub records: Vec<RecordReport>,

    /// Tasks that panicked or were cancelled before reporting
    pub aborted_tasks: usize,
}

impl CycleReport {
    /// Whether discovery succeeded and every record synchronized
    pub fn is_clean(&self) -> bool {
        self.discovery_error.is_none() && self.failed() == 0
    }

    /// Number of records synchronized successfully
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_ok()).count()
    }

    /// Number of records that failed, including aborted tasks
    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_err()).count() + self.aborted_tasks
    }

    /// Number of provider writes issued
    pub fn writes(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.result.as_ref().is_ok_and(SyncOutcome::wrote))
            .count()
    }

    /// Result for `hostname`, if it was attempted
    pub fn result_for(&self, hostname: &str) -> Option<&Result<SyncOutcome>> {
        self.records
            .iter()
            .find(|r| r.hostname == hostname)
            .map(|r| &r.result)
    }
}

/// Drives one reconciliation cycle across all managed records
///
/// Owns the [`RecordRegistry`]; records are handed to tasks by value and
/// written back only when their task succeeds.
pub struct Reconciler {
    /// Public address discovery
    ip_source: Arc<dyn IpSource>,

    /// Shared per-record synchronizer
    synchronizer: Synchronizer,

    /// Records under management
    registry: RecordRegistry,

    /// Upper bound on IP discovery
    discovery_timeout: Duration,
}

impl Reconciler {
    /// Create a reconciler
    ///
    /// IP discovery is bounded by `discovery_timeout`.
    pub fn new(
        ip_source: Arc<dyn IpSource>,
        synchronizer: Synchronizer,
        registry: RecordRegistry,
        discovery_timeout: Duration,
    ) -> Self {
        Self {
            ip_source,
            synchronizer,
            registry,
            discovery_timeout,
        }
    }

    /// The managed records and their current state
    pub fn registry(&self) -> &RecordRegistry {
        &self.registry
    }

    /// Run one cycle: discover the address, then synchronize every record
    /// concurrently and wait for all of them
    pub async fn run_cycle(&mut self) -> CycleReport {
        let ip = match self.discover().await {
            Ok(ip) => ip,
            Err(e) => {
                error!("Error retrieving IP: {}", e);
                return CycleReport {
                    discovery_error: Some(e),
                    ..CycleReport::default()
                };
            }
        };
        debug!("Discovered IP: {}", ip);

        let mut tasks = JoinSet::new();
        for (index, record) in self.registry.records().iter().enumerate() {
            let synchronizer = self.synchronizer.clone();
            let mut record: ManagedRecord = record.clone();
            tasks.spawn(async move {
                let result = synchronizer.synchronize(&mut record, ip).await;
                (index, record, result)
            });
        }

        let mut finished = Vec::with_capacity(self.registry.len());
        let mut aborted_tasks = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record, result)) => {
                    let hostname = record.hostname().to_string();
                    match &result {
                        Ok(_) => self.registry.store(index, record),
                        Err(e) => error!("Error updating {}: {}", hostname, e),
                    }
                    finished.push((index, RecordReport { hostname, result }));
                }
                Err(e) => {
                    error!("Reconciliation task did not complete: {}", e);
                    aborted_tasks += 1;
                }
            }
        }
        finished.sort_by_key(|(index, _)| *index);

        let report = CycleReport {
            discovered_ip: Some(ip),
            discovery_error: None,
            records: finished.into_iter().map(|(_, r)| r).collect(),
            aborted_tasks,
        };

        if report.failed() > 0 {
            error!(
                "Error updating DNS: {} of {} record(s) failed for {}",
                report.failed(),
                self.registry.len(),
                ip
            );
        } else {
            info!(
                "Cycle complete for {}: {} record(s), {} write(s)",
                ip,
                report.succeeded(),
                report.writes()
            );
        }

        report
    }

    async fn discover(&self) -> Result<Ipv4Addr> {
        match tokio::time::timeout(self.discovery_timeout, self.ip_source.current()).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(
                format!("{} lookup", self.ip_source.source_name()),
                self.discovery_timeout,
            )),
        }
    }
}
