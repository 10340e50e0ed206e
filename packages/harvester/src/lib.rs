//! Scheduled, concurrent harvesting of employer career pages.
//!
//! The subsystem polls a fixed roster of external sources through
//! site-specific adapters, normalizes results into canonical postings,
//! rejects duplicates via content fingerprints, and tracks every execution
//! as an auditable job.
//!
//! ```text
//! Scheduler (minute tick) ──► Orchestrator ──► Adapter.harvest()
//!                                 │                  │ (Transport: paced, retried)
//!                                 │                  ▼
//!                                 │             RawPostings
//!                                 │                  │
//!                                 ▼                  ▼
//!                            Job lifecycle      Store (dedup gate)
//!                            + run records      + retention sweep
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod orchestrator;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod storage;
pub mod transport;

pub use config::HarvesterConfig;
pub use error::{TransportError, TriggerError};
pub use orchestrator::Orchestrator;
pub use scheduler::Scheduler;
pub use service::HarvesterService;
pub use storage::{InsertOutcome, Store};
pub use transport::Transport;
