//! Document store abstraction.

use std::sync::Arc;

use thiserror::Error;

use crate::document::Document;
use crate::filter::Filter;

/// Document store operation error.
///
/// These are infrastructure errors reported by the backend. Callers decide how
/// to surface them; the store itself never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentStoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document has no string id")]
    MissingId,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-field sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Optional modifiers for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// `None` keeps store-native order.
    pub sort: Option<SortOrder>,
    /// `None` returns every match.
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            sort: None,
            limit: Some(limit),
        }
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Collection-oriented document store.
///
/// Calls are synchronous and block until the backend answers. The only
/// atomicity guarantee is per document: a single update applies all of its
/// fields or none of them. There are no cross-document transactions.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - key documents by their string `id` field, unique per collection
/// - reject inserts whose id already exists with `DuplicateKey`
/// - treat a missing field and an explicit null identically in filters
/// - never modify the `id` field through an update
/// - make `delete_one` idempotent
pub trait DocumentStore: Send + Sync {
    /// Load a single document by id.
    fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError>;

    /// Load documents matching `filter`.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DocumentStoreError>;

    /// Insert a new document.
    fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError>;

    /// Set the given fields on the document with `id`.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentStoreError>;

    /// Like [`DocumentStore::update_fields`], but only applied if the stored
    /// document still matches `guard`; otherwise reports `NotFound`.
    fn update_fields_where(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError>;

    /// Remove the document with `id`. Removing a missing id succeeds.
    fn delete_one(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError>;

    /// Number of documents matching `filter`.
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DocumentStoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        (**self).find_one(collection, id)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        (**self).find(collection, filter, options)
    }

    fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError> {
        (**self).insert_one(collection, document)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        (**self).update_fields(collection, id, fields)
    }

    fn update_fields_where(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        (**self).update_fields_where(collection, id, guard, fields)
    }

    fn delete_one(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        (**self).delete_one(collection, id)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DocumentStoreError> {
        (**self).count(collection, filter)
    }
}
