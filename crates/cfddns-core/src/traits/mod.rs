//! Core traits for cfddns
//!
//! This module defines the collaborator interfaces the reconciler depends on.
//!
//! - [`IpSource`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Query and write A records via a provider API

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, NewRecord, RecordType, RemoteRecord};
