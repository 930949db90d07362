//! Contract Test: Per-record Synchronization
//!
//! Verifies the create / update / no-op decision for a single record.
//!
//! Constraints verified:
//! - A record already confirmed at the target costs zero provider calls
//! - A never-synchronized record always queries the provider
//! - Absent records are created exactly once, unproxied
//! - Drifted records are updated in place by ID
//! - More than one matching record is rejected without writing
//! - `last_known_ip` moves only after provider success

mod common;

use cfddns_core::{Error, ManagedRecord, SyncOutcome};
use common::*;
use std::sync::Arc;

const HOST: &str = "home.example.com";

#[tokio::test]
async fn synced_record_makes_no_provider_calls() {
    let provider = Arc::new(MockDnsProvider::new().with_record(HOST, "198.51.100.7"));
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    sync.synchronize(&mut record, IP).await.unwrap();
    let calls_after_first = provider.total_call_count();

    for _ in 0..3 {
        let outcome = sync.synchronize(&mut record, IP).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    assert_eq!(
        provider.total_call_count(),
        calls_after_first,
        "repeat synchronization to the same IP must not touch the provider"
    );
}

#[tokio::test]
async fn unset_record_always_queries_provider() {
    let provider = Arc::new(MockDnsProvider::new().with_record(HOST, &IP.to_string()));
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);
    assert!(record.is_unset());

    let outcome = sync.synchronize(&mut record, IP).await.unwrap();

    assert_eq!(provider.list_call_count(), 1);
    assert_eq!(outcome, SyncOutcome::AlreadyCurrent);
    assert_eq!(provider.create_call_count() + provider.update_call_count(), 0);
    assert_eq!(record.last_known_ip(), Some(IP), "matching remote state clears unset");
}

#[tokio::test]
async fn absent_record_is_created_once() {
    let provider = Arc::new(MockDnsProvider::new());
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    let outcome = sync.synchronize(&mut record, IP).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Created);
    assert_eq!(provider.create_call_count(), 1);
    assert_eq!(provider.update_call_count(), 0);

    let created = provider.created();
    assert_eq!(created[0].name, HOST);
    assert_eq!(created[0].content, IP.to_string());
    assert_eq!(created[0].record_type.as_str(), "A");
    assert!(!created[0].proxied);
    assert!((60..=300).contains(&created[0].ttl));

    assert_eq!(record.last_known_ip(), Some(IP));
}

#[tokio::test]
async fn failed_create_leaves_record_unset() {
    let provider = Arc::new(MockDnsProvider::new().failing(HOST, FailOn::Create));
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    let result = sync.synchronize(&mut record, IP).await;

    assert!(result.is_err());
    assert!(record.is_unset());
    assert_eq!(provider.create_call_count(), 1);
}

#[tokio::test]
async fn drifted_record_is_updated_in_place() {
    let provider = Arc::new(MockDnsProvider::new().with_record(HOST, &OTHER_IP.to_string()));
    let record_id = provider.remote(HOST)[0].id.clone();
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    let outcome = sync.synchronize(&mut record, IP).await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            previous_ip: Some(OTHER_IP)
        }
    );
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(provider.create_call_count(), 0);
    assert_eq!(provider.updated(), vec![(record_id.clone(), IP.to_string())]);

    // Same record, new content
    let remote = provider.remote(HOST);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, record_id);
    assert_eq!(remote[0].content, IP.to_string());

    assert_eq!(record.last_known_ip(), Some(IP));
}

#[tokio::test]
async fn failed_update_keeps_previous_state() {
    let provider = Arc::new(MockDnsProvider::new().with_record(HOST, &OTHER_IP.to_string()));
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    // Confirm OTHER_IP first
    sync.synchronize(&mut record, OTHER_IP).await.unwrap();
    assert_eq!(record.last_known_ip(), Some(OTHER_IP));

    provider.fail(HOST, FailOn::Update);
    let result = sync.synchronize(&mut record, IP).await;

    assert!(result.is_err());
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(record.last_known_ip(), Some(OTHER_IP), "failed write must not advance state");

    // Next attempt retries the same target
    provider.recover(HOST, FailOn::Update);
    sync.synchronize(&mut record, IP).await.unwrap();
    assert_eq!(provider.update_call_count(), 2);
    assert_eq!(record.last_known_ip(), Some(IP));
}

#[tokio::test]
async fn failed_listing_is_reported_with_hostname() {
    let provider = Arc::new(MockDnsProvider::new().failing(HOST, FailOn::List));
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    let err = sync.synchronize(&mut record, IP).await.unwrap_err();

    assert!(err.to_string().contains(HOST), "error should name the host: {}", err);
    assert_eq!(provider.create_call_count() + provider.update_call_count(), 0);
    assert!(record.is_unset());
}

#[tokio::test]
async fn duplicate_remote_records_are_rejected() {
    let provider = Arc::new(
        MockDnsProvider::new()
            .with_record(HOST, "198.51.100.1")
            .with_record(HOST, "198.51.100.2"),
    );
    let sync = synchronizer(&provider);
    let mut record = ManagedRecord::new(HOST, ZONE);

    let err = sync.synchronize(&mut record, IP).await.unwrap_err();

    match &err {
        Error::AmbiguousRecords { hostname, count } => {
            assert_eq!(hostname, HOST);
            assert_eq!(*count, 2);
        }
        other => panic!("expected AmbiguousRecords, got {:?}", other),
    }
    assert!(err.to_string().contains(HOST));
    assert_eq!(provider.create_call_count(), 0);
    assert_eq!(provider.update_call_count(), 0);
    assert!(record.is_unset());
    assert_eq!(provider.remote(HOST).len(), 2, "records are never deleted");
}
