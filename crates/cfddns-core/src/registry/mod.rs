//! Managed record registry
//!
//! The registry holds one [`ManagedRecord`] per configured hostname. It is
//! built once at startup by resolving each hostname's parent domain to a
//! provider zone, and its membership never changes afterwards. Only the
//! per-record `last_known_ip` moves, and only through the
//! [`Synchronizer`](crate::sync::Synchronizer).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cfddns_core::registry::RecordRegistry;
//!
//! let hostnames = vec!["home.example.com".to_string()];
//! let registry = RecordRegistry::build(&hostnames, provider.as_ref()).await?;
//! assert_eq!(registry.len(), 1);
//! ```

use crate::error::{Error, Result};
use crate::traits::DnsProvider;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// One A record under management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecord {
    hostname: String,
    zone_id: String,
    last_known_ip: Option<Ipv4Addr>,
}

impl ManagedRecord {
    /// Create a record that has never been synchronized
    pub fn new(hostname: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            zone_id: zone_id.into(),
            last_known_ip: None,
        }
    }

    /// Fully-qualified hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Provider zone the record lives in
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Address last confirmed at the provider, `None` until the first success
    pub fn last_known_ip(&self) -> Option<Ipv4Addr> {
        self.last_known_ip
    }

    /// Whether the record has never been synchronized
    pub fn is_unset(&self) -> bool {
        self.last_known_ip.is_none()
    }

    /// Whether the record is known to point at `ip` already
    pub fn is_synced_to(&self, ip: Ipv4Addr) -> bool {
        self.last_known_ip == Some(ip)
    }

    /// Record a confirmed provider state
    pub(crate) fn mark_synced(&mut self, ip: Ipv4Addr) {
        self.last_known_ip = Some(ip);
    }
}

/// Set of managed records, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct RecordRegistry {
    records: Vec<ManagedRecord>,
}

impl RecordRegistry {
    /// Build the registry from configured hostnames
    ///
    /// Each hostname's parent domain is resolved to a zone ID through the
    /// provider. Domains shared by several hostnames are looked up once.
    ///
    /// # Errors
    ///
    /// Any invalid hostname or failed zone lookup aborts construction; there
    /// is nothing to manage without a zone.
    pub async fn build(hostnames: &[String], provider: &dyn DnsProvider) -> Result<Self> {
        let mut zones: HashMap<String, String> = HashMap::new();
        let mut records = Vec::with_capacity(hostnames.len());

        for hostname in hostnames {
            let domain = parent_domain(hostname)?;
            debug!("Using domain {} from hostname {}", domain, hostname);

            let zone_id = match zones.get(domain) {
                Some(zone_id) => zone_id.clone(),
                None => {
                    debug!("Querying {} zone ID for domain {}", provider.provider_name(), domain);
                    let zone_id = provider.resolve_zone_id(domain).await.map_err(|e| {
                        Error::config(format!(
                            "cannot resolve zone for domain {} (hostname {}): {}",
                            domain, hostname, e
                        ))
                    })?;
                    debug!("Got zone ID {} for domain {}", zone_id, domain);
                    zones.insert(domain.to_string(), zone_id.clone());
                    zone_id
                }
            };

            records.push(ManagedRecord::new(hostname.clone(), zone_id));
        }

        info!(
            "Managing {} record(s) across {} zone(s)",
            records.len(),
            zones.len()
        );
        Self::from_records(records)
    }

    /// Build a registry from already-resolved records
    ///
    /// # Errors
    ///
    /// Hostnames must be unique.
    pub fn from_records(records: Vec<ManagedRecord>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for record in &records {
            if !seen.insert(record.hostname.to_ascii_lowercase()) {
                return Err(Error::config(format!(
                    "Hostname listed more than once: {}",
                    record.hostname
                )));
            }
        }
        Ok(Self { records })
    }

    /// Number of managed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are managed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the records
    pub fn iter(&self) -> impl Iterator<Item = &ManagedRecord> {
        self.records.iter()
    }

    /// Look up a record by hostname
    pub fn get(&self, hostname: &str) -> Option<&ManagedRecord> {
        self.records
            .iter()
            .find(|r| r.hostname.eq_ignore_ascii_case(hostname))
    }

    /// Records in registration order, for the reconciler's fan-out
    pub(crate) fn records(&self) -> &[ManagedRecord] {
        &self.records
    }

    /// Write back a record returned by a reconciliation task
    ///
    /// Only `last_known_ip` is taken from `updated`; identity never changes.
    pub(crate) fn store(&mut self, index: usize, updated: ManagedRecord) {
        if let Some(slot) = self.records.get_mut(index)
            && slot.hostname == updated.hostname
        {
            slot.last_known_ip = updated.last_known_ip;
        }
    }
}

/// Strip the leftmost label: `foo.example.com` → `example.com`
///
/// # Errors
///
/// The hostname must contain a dot with a non-empty label on each side.
pub fn parent_domain(hostname: &str) -> Result<&str> {
    match hostname.split_once('.') {
        Some((label, domain)) if !label.is_empty() && !domain.is_empty() => Ok(domain),
        _ => Err(Error::config(format!(
            "Hostname has no parent domain: {}",
            hostname
        ))),
    }
}
