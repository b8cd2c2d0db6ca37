//! `jobkeeper-core`: shared building blocks for the job persistence engine.
//!
//! Identifiers, the clock abstraction and the read-only store settings live
//! here so that both the document layer and the job layer can depend on them
//! without depending on each other.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ExecutionScope, JobStoreSettings};
pub use error::DomainError;
pub use id::JobId;
