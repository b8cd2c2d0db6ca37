//! Lease-based job persistence and expiry detection.
//!
//! ## Design
//!
//! - Jobs are flat records in a document collection, keyed by id
//! - A job is leased by writing `lockOwner` + `lockExpirationTime`
//! - Expired leases and orphaned (never leased, too old) jobs are found by query
//! - Updates are partial: only changed lease/retry fields are written
//!
//! ## Components
//!
//! - `JobRecord`: persisted job shape plus the snapshot taken at load time
//! - `filters`: eligibility, expiry and correlation predicates
//! - `dirty`: snapshot diffing for partial updates
//! - `JobStore`: the persistence surface (`DocumentJobStore` over any `DocumentStore`)

pub mod dirty;
pub mod document_store;
pub mod error;
pub mod filters;
pub mod query;
pub mod record;
pub mod store;

pub use document_store::{COLLECTION_JOBS, DocumentJobStore};
pub use error::JobStoreError;
pub use query::JobQuery;
pub use record::JobRecord;
pub use store::JobStore;
