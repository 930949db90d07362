// # DNS Provider Trait
//
// Defines the interface for reading and writing A records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::{DnsProvider, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let zone_id = provider.resolve_zone_id("example.com").await?;
//     let records = provider
//         .list_records(&zone_id, "home.example.com", RecordType::A)
//         .await?;
//     println!("{} matching record(s)", records.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;

/// DNS record type handled by cfddns
///
/// Only A records are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as it currently exists at the provider
///
/// Read-only snapshot returned by [`DnsProvider::list_records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Provider-assigned record ID
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the address, for A records)
    pub content: String,
}

impl RemoteRecord {
    /// Whether this record already points at `ip`
    ///
    /// Content that doesn't parse as IPv4 never matches.
    pub fn points_to(&self, ip: Ipv4Addr) -> bool {
        self.content.trim().parse::<Ipv4Addr>().is_ok_and(|current| current == ip)
    }
}

/// Parameters for creating a new record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Fully-qualified record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Route traffic through the provider's network
    pub proxied: bool,
}

impl NewRecord {
    /// Build an unproxied A record pointing `name` at `ip`
    pub fn a(name: impl Into<String>, ip: Ipv4Addr, ttl: u32) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            content: ip.to_string(),
            ttl,
            proxied: false,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Each method maps to exactly one provider API call. Deciding *whether* to
/// call them is the job of the [`Synchronizer`](crate::sync::Synchronizer).
///
/// # Thread Safety
///
/// A single provider handle is built at startup and shared by every
/// per-record task in a cycle, so implementations must be safe for
/// concurrent calls.
///
/// # Rules
///
/// - ✅ Perform HTTP/HTTPS API calls to the provider only
/// - ✅ Map provider errors to [`crate::Error`]
/// - ❌ Retry, back off, or sleep (the scheduler retries next cycle)
/// - ❌ Cache records between calls
/// - ❌ Delete records
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a registered domain (e.g. `example.com`) to its zone ID
    ///
    /// Called once per hostname at startup.
    async fn resolve_zone_id(&self, domain: &str) -> Result<String, crate::Error>;

    /// List records of `record_type` named `name` within `zone_id`
    ///
    /// Returns an empty vector when nothing matches.
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>, crate::Error>;

    /// Create a new record in `zone_id`
    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<(), crate::Error>;

    /// Replace the content of an existing record, keeping its ID and type
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(content: &str) -> RemoteRecord {
        RemoteRecord {
            id: "rec-1".to_string(),
            name: "home.example.com".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_points_to() {
        let ip = Ipv4Addr::new(203, 0, 113, 9);
        assert!(remote("203.0.113.9").points_to(ip));
        assert!(remote(" 203.0.113.9\n").points_to(ip));
        assert!(!remote("203.0.113.10").points_to(ip));
        assert!(!remote("not-an-ip").points_to(ip));
    }

    #[test]
    fn test_new_a_record_is_unproxied() {
        let record = NewRecord::a("home.example.com", Ipv4Addr::new(198, 51, 100, 1), 300);
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.content, "198.51.100.1");
        assert!(!record.proxied);
        assert_eq!(record.ttl, 300);
    }
}
