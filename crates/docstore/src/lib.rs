//! Document store boundary.
//!
//! This crate defines the storage-facing abstraction the job layer is written
//! against: flat documents keyed by a string `id`, a small predicate tree, and
//! a synchronous store trait. It makes no assumptions about the backing
//! database; [`InMemoryDocumentStore`] is provided for tests/dev.

pub mod document;
pub mod filter;
pub mod in_memory;
pub mod store;

pub use document::{Document, FieldValue, ID_FIELD};
pub use filter::Filter;
pub use in_memory::InMemoryDocumentStore;
pub use store::{DocumentStore, DocumentStoreError, FindOptions, SortDirection, SortOrder};
