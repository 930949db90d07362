//! Test doubles and common utilities for contract tests
//!
//! This module provides an in-memory DNS provider and a scripted IP source
//! with call counters, so tests can assert exactly which provider calls a
//! cycle made.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{DnsProvider, IpSource, NewRecord, RecordType, RemoteRecord};
use cfddns_core::{ManagedRecord, Reconciler, RecordRegistry, Synchronizer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Zone ID every test record lives in
pub const ZONE: &str = "zone-example";

/// Discovered address used throughout the tests
pub const IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 9);

/// A second address, for drift scenarios
pub const OTHER_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 7);

/// Which provider call should fail for a hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    List,
    Create,
    Update,
}

/// In-memory DNS provider that tracks calls
#[derive(Default)]
pub struct MockDnsProvider {
    /// Remote records keyed by hostname
    records: Mutex<HashMap<String, Vec<RemoteRecord>>>,
    /// Injected failures
    failures: Mutex<HashSet<(String, FailOn)>>,
    /// Created records, in call order
    created: Mutex<Vec<NewRecord>>,
    /// (record ID, content) for every update call
    updated: Mutex<Vec<(String, String)>>,
    /// Artificial latency per call
    delay: Mutex<Option<Duration>>,
    list_call_count: AtomicUsize,
    create_call_count: AtomicUsize,
    update_call_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing A record
    pub fn with_record(self, hostname: &str, content: &str) -> Self {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records
            .lock()
            .unwrap()
            .entry(hostname.to_string())
            .or_default()
            .push(RemoteRecord {
                id,
                name: hostname.to_string(),
                content: content.to_string(),
            });
        self
    }

    /// Make `call` fail for `hostname`
    pub fn failing(self, hostname: &str, call: FailOn) -> Self {
        self.fail(hostname, call);
        self
    }

    /// Make `call` fail for `hostname` from now on
    pub fn fail(&self, hostname: &str, call: FailOn) {
        self.failures
            .lock()
            .unwrap()
            .insert((hostname.to_string(), call));
    }

    /// Stop failing `call` for `hostname`
    pub fn recover(&self, hostname: &str, call: FailOn) {
        self.failures
            .lock()
            .unwrap()
            .remove(&(hostname.to_string(), call));
    }

    /// Add latency to every call
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    pub fn total_call_count(&self) -> usize {
        self.list_call_count() + self.create_call_count() + self.update_call_count()
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<NewRecord> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, String)> {
        self.updated.lock().unwrap().clone()
    }

    /// Current remote records for a hostname
    pub fn remote(&self, hostname: &str) -> Vec<RemoteRecord> {
        self.records
            .lock()
            .unwrap()
            .get(hostname)
            .cloned()
            .unwrap_or_default()
    }

    fn should_fail(&self, hostname: &str, call: FailOn) -> bool {
        self.failures
            .lock()
            .unwrap()
            .contains(&(hostname.to_string(), call))
    }

    fn hostname_for_id(&self, record_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|(_, recs)| recs.iter().any(|r| r.id == record_id))
            .map(|(hostname, _)| hostname.clone())
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn resolve_zone_id(&self, _domain: &str) -> Result<String> {
        Ok(ZONE.to_string())
    }

    async fn list_records(
        &self,
        _zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        assert_eq!(record_type, RecordType::A);
        self.enter().await;
        let result = if self.should_fail(name, FailOn::List) {
            Err(Error::provider("mock", format!("list failed for {}", name)))
        } else {
            Ok(self.remote(name))
        };
        self.leave();
        result
    }

    async fn create_record(&self, _zone_id: &str, record: &NewRecord) -> Result<()> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = if self.should_fail(&record.name, FailOn::Create) {
            Err(Error::provider("mock", format!("create failed for {}", record.name)))
        } else {
            self.created.lock().unwrap().push(record.clone());
            let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.records
                .lock()
                .unwrap()
                .entry(record.name.clone())
                .or_default()
                .push(RemoteRecord {
                    id,
                    name: record.name.clone(),
                    content: record.content.clone(),
                });
            Ok(())
        };
        self.leave();
        result
    }

    async fn update_record(&self, _zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let hostname = self.hostname_for_id(record_id).unwrap_or_default();
        let result = if self.should_fail(&hostname, FailOn::Update) {
            Err(Error::provider("mock", format!("update failed for {}", hostname)))
        } else {
            self.updated
                .lock()
                .unwrap()
                .push((record_id.to_string(), content.to_string()));
            if let Some(recs) = self.records.lock().unwrap().get_mut(&hostname) {
                for rec in recs.iter_mut().filter(|r| r.id == record_id) {
                    rec.content = content.to_string();
                }
            }
            Ok(())
        };
        self.leave();
        result
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// IP source that replays a script of results
///
/// The last entry repeats once the script runs out.
pub struct ScriptedIpSource {
    script: Mutex<VecDeque<std::result::Result<Ipv4Addr, String>>>,
    current_call_count: AtomicUsize,
}

impl ScriptedIpSource {
    /// Always return `ip`
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::sequence(vec![Ok(ip)])
    }

    /// Always fail
    pub fn failing(msg: &str) -> Self {
        Self::sequence(vec![Err(msg.to_string())])
    }

    pub fn sequence(script: Vec<std::result::Result<Ipv4Addr, String>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one entry");
        Self {
            script: Mutex::new(script.into()),
            current_call_count: AtomicUsize::new(0),
        }
    }

    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        };
        next.map_err(Error::ip_source)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Registry of never-synchronized records in [`ZONE`]
pub fn registry(hostnames: &[&str]) -> RecordRegistry {
    RecordRegistry::from_records(
        hostnames
            .iter()
            .map(|h| ManagedRecord::new(*h, ZONE))
            .collect(),
    )
    .expect("unique hostnames")
}

/// Synchronizer over `provider` with a 300s TTL and 5s timeout
pub fn synchronizer(provider: &Arc<MockDnsProvider>) -> Synchronizer {
    Synchronizer::new(provider.clone(), 300, Duration::from_secs(5))
}

/// Reconciler wired to the given doubles
pub fn reconciler(
    ip_source: &Arc<ScriptedIpSource>,
    provider: &Arc<MockDnsProvider>,
    hostnames: &[&str],
) -> Reconciler {
    Reconciler::new(
        ip_source.clone(),
        synchronizer(provider),
        registry(hostnames),
        Duration::from_secs(5),
    )
}
