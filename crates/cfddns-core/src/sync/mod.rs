//! Per-record DNS synchronization
//!
//! Brings one [`ManagedRecord`] in line with a target address using at most
//! one provider write:
//!
//! ```text
//! last_known_ip == target ──────────────► Unchanged (no remote call)
//!          │
//!          ▼
//!   list_records(hostname, A)
//!          │
//!   ┌──────┼──────────────┬──────────────────┐
//!   0      1 (same IP)    1 (other IP)       ≥2
//!   │      │              │                  │
//! create  AlreadyCurrent  update by ID       AmbiguousRecords
//! ```
//!
//! `last_known_ip` is advanced only after the provider confirmed the state.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::ManagedRecord;
use crate::traits::{DnsProvider, NewRecord, RecordType};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What [`Synchronizer::synchronize`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local state already matched; the provider was not contacted
    Unchanged,
    /// Remote record already had the target address; no write issued
    AlreadyCurrent,
    /// No record existed; one was created
    Created,
    /// Existing record was repointed
    Updated {
        /// Address the record held before the update, if it parsed
        previous_ip: Option<Ipv4Addr>,
    },
}

impl SyncOutcome {
    /// Whether a provider write happened
    pub fn wrote(&self) -> bool {
        matches!(self, SyncOutcome::Created | SyncOutcome::Updated { .. })
    }
}

/// Reconciles single records against the provider
///
/// Cheap to clone; every clone shares the same provider handle.
#[derive(Clone)]
pub struct Synchronizer {
    provider: Arc<dyn DnsProvider>,
    ttl: u32,
    request_timeout: Duration,
}

impl Synchronizer {
    /// Create a synchronizer writing records with `ttl` and bounding each
    /// provider call by `request_timeout`
    pub fn new(provider: Arc<dyn DnsProvider>, ttl: u32, request_timeout: Duration) -> Self {
        Self {
            provider,
            ttl,
            request_timeout,
        }
    }

    /// Create a synchronizer from the `[engine]` table
    pub fn from_config(provider: Arc<dyn DnsProvider>, config: &EngineConfig) -> Self {
        Self::new(provider, config.record_ttl, config.request_timeout())
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Point `record` at `target`
    ///
    /// # Errors
    ///
    /// - provider query or write failures (including timeouts)
    /// - [`Error::AmbiguousRecords`] when more than one A record matches
    ///
    /// On error `record` is left untouched.
    pub async fn synchronize(
        &self,
        record: &mut ManagedRecord,
        target: Ipv4Addr,
    ) -> Result<SyncOutcome> {
        if record.is_synced_to(target) {
            debug!("Record {} already at {}, skipping provider", record.hostname(), target);
            return Ok(SyncOutcome::Unchanged);
        }

        let existing = self
            .bounded(
                "list_records",
                self.provider
                    .list_records(record.zone_id(), record.hostname(), RecordType::A),
            )
            .await
            .map_err(|e| with_hostname(record.hostname(), "fetching records", e))?;

        let outcome = match existing.as_slice() {
            [] => {
                debug!("Creating new A record for {} -> {}", record.hostname(), target);
                let new_record = NewRecord::a(record.hostname(), target, self.ttl);
                self.bounded(
                    "create_record",
                    self.provider.create_record(record.zone_id(), &new_record),
                )
                .await
                .map_err(|e| with_hostname(record.hostname(), "creating record", e))?;

                info!("Created {} -> {}", record.hostname(), target);
                SyncOutcome::Created
            }
            [current] if current.points_to(target) => {
                info!(
                    "Record {} IP {} hasn't changed, not taking action",
                    record.hostname(),
                    target
                );
                SyncOutcome::AlreadyCurrent
            }
            [current] => {
                debug!(
                    "Updating A record {} for {} -> {} (was {})",
                    current.id,
                    record.hostname(),
                    target,
                    current.content
                );
                self.bounded(
                    "update_record",
                    self.provider
                        .update_record(record.zone_id(), &current.id, &target.to_string()),
                )
                .await
                .map_err(|e| with_hostname(record.hostname(), "updating record", e))?;

                info!("Updated {} -> {}", record.hostname(), target);
                SyncOutcome::Updated {
                    previous_ip: current.content.trim().parse().ok(),
                }
            }
            many => return Err(Error::ambiguous(record.hostname(), many.len())),
        };

        record.mark_synced(target);
        Ok(outcome)
    }

    /// Run a provider call under the request timeout
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation, self.request_timeout)),
        }
    }
}

/// Attach the hostname to a provider error, leaving typed variants alone
fn with_hostname(hostname: &str, action: &str, err: Error) -> Error {
    match err {
        Error::AmbiguousRecords { .. } | Error::Timeout { .. } => err,
        other => Error::dns_provider(format!("{} for {}: {}", action, hostname, other)),
    }
}
