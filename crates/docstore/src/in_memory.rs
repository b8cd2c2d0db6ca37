//! In-memory `DocumentStore` implementation (tests/dev).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::document::{Document, FieldValue, ID_FIELD};
use crate::filter::Filter;
use crate::store::{DocumentStore, DocumentStoreError, FindOptions, SortDirection, SortOrder};

/// In-memory document store.
///
/// Intended for tests/dev. Documents are kept in insertion order per
/// collection, which is the "native" order returned by unsorted finds.
/// Not optimized for performance: every query is a full scan.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Document>>>, DocumentStoreError> {
        self.collections
            .read()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>, DocumentStoreError> {
        self.collections
            .write()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn id_of(doc: &Document) -> Option<&str> {
        doc.get(ID_FIELD).and_then(FieldValue::as_str)
    }

    fn sort(docs: &mut [Document], order: &SortOrder) {
        docs.sort_by(|a, b| {
            let ord = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                // Missing values sort first, as nulls do in most document stores.
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match order.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    fn apply(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        let mut collections = self.write()?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| Self::id_of(d) == Some(id)))
            .filter(|d| guard.matches(d))
            .ok_or_else(|| DocumentStoreError::NotFound(id.to_string()))?;

        for (field, value) in fields {
            if field == ID_FIELD {
                continue;
            }
            doc.insert(field, value);
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| Self::id_of(d) == Some(id)))
            .cloned())
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        let collections = self.read()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched: Vec<Document> = docs.iter().filter(|d| filter.matches(d)).cloned().collect();
        if let Some(order) = &options.sort {
            Self::sort(&mut matched, order);
        }
        if let Some(limit) = options.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError> {
        let id = Self::id_of(&document)
            .ok_or(DocumentStoreError::MissingId)?
            .to_string();

        let mut collections = self.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| Self::id_of(d) == Some(id.as_str())) {
            return Err(DocumentStoreError::DuplicateKey(id));
        }
        docs.push(document);
        Ok(())
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.apply(collection, id, &Filter::All, fields)
    }

    fn update_fields_where(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.apply(collection, id, guard, fields)
    }

    fn delete_one(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        let mut collections = self.write()?;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| Self::id_of(d) != Some(id));
        }
        Ok(())
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DocumentStoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }
}
