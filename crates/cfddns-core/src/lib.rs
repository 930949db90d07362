// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// cfddns keeps the A records of a fixed set of hostnames pointed at the
// caller's public IPv4 address:
// - **IpSource**: Trait for discovering the current public address
// - **DnsProvider**: Trait for listing, creating and updating A records
// - **RecordRegistry**: The managed records, built once at startup
// - **Synchronizer**: Reconciles one record with at most one provider write
// - **Reconciler**: One cycle, fanned out concurrently across records
// - **Scheduler**: The discover → reconcile → sleep loop
// - **IntervalPolicy**: Randomized sleep between cycles
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and IP source crates
// 2. **Per-record State**: Each record carries its own last confirmed address
// 3. **Isolation**: One record's failure never blocks another's
// 4. **Idempotency**: Unchanged records cost no provider calls
// 5. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod registry;
pub mod sync;
pub mod interval;
pub mod config;
pub mod error;

#[cfg(any(test, feature = "testing"))]
pub mod test_support;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource, NewRecord, RecordType, RemoteRecord};
pub use engine::{CycleReport, Reconciler, RecordReport, Scheduler};
pub use registry::{ManagedRecord, RecordRegistry};
pub use sync::{SyncOutcome, Synchronizer};
pub use interval::{FixedInterval, IntervalPolicy, RandomInterval};
pub use config::{CfddnsConfig, Credentials, EngineConfig, ScheduleConfig};
pub use error::{Error, Result};
