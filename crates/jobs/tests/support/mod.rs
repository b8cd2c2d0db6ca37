//! Shared fixtures for the job store integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use jobkeeper_core::{ExecutionScope, JobStoreSettings, ManualClock};
use jobkeeper_docstore::{
    Document, DocumentStore, DocumentStoreError, Filter, FindOptions, InMemoryDocumentStore,
};
use jobkeeper_jobs::{DocumentJobStore, JobRecord, JobStore};

pub const RESET_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn settings(scope: ExecutionScope, clock: Arc<ManualClock>) -> JobStoreSettings {
    JobStoreSettings::default()
        .with_execution_scope(scope)
        .with_max_reset_timeout(RESET_TIMEOUT)
        .with_clock(clock)
}

/// Job store over a fresh shared in-memory collection, plus its clock.
pub fn job_store(
    scope: ExecutionScope,
) -> (
    DocumentJobStore<Arc<InMemoryDocumentStore>>,
    Arc<InMemoryDocumentStore>,
    Arc<ManualClock>,
) {
    jobkeeper_observability::init_for_tests();
    let clock = Arc::new(ManualClock::new(epoch()));
    let docs = Arc::new(InMemoryDocumentStore::new());
    let jobs = DocumentJobStore::new(docs.clone(), settings(scope, clock.clone()));
    (jobs, docs, clock)
}

pub fn insert_job(
    jobs: &impl JobStore,
    execution_id: Option<&str>,
    process_instance_id: Option<&str>,
    scope_type: Option<&str>,
) -> JobRecord {
    let mut job = jobs.create();
    job.set_execution_id(execution_id.map(str::to_string));
    job.set_process_instance_id(process_instance_id.map(str::to_string));
    job.set_scope_type(scope_type.map(str::to_string));
    jobs.insert(&mut job).unwrap();
    job
}

/// Store wrapper that records every partial write it forwards.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryDocumentStore,
    pub writes: Mutex<Vec<(String, Document)>>,
}

impl RecordingStore {
    pub fn writes(&self) -> Vec<(String, Document)> {
        self.writes.lock().unwrap().clone()
    }
}

impl DocumentStore for RecordingStore {
    fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        self.inner.find_one(collection, id)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        self.inner.find(collection, filter, options)
    }

    fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError> {
        self.inner.insert_one(collection, document)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.writes.lock().unwrap().push((id.to_string(), fields.clone()));
        self.inner.update_fields(collection, id, fields)
    }

    fn update_fields_where(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.writes.lock().unwrap().push((id.to_string(), fields.clone()));
        self.inner.update_fields_where(collection, id, guard, fields)
    }

    fn delete_one(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        self.inner.delete_one(collection, id)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DocumentStoreError> {
        self.inner.count(collection, filter)
    }
}

/// Store wrapper whose deletes start failing after a fixed number succeed,
/// and which can be switched fully offline.
pub struct FlakyStore {
    pub inner: InMemoryDocumentStore,
    deletes_left: AtomicUsize,
    offline: AtomicBool,
}

impl FlakyStore {
    pub fn new(successful_deletes: usize) -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            deletes_left: AtomicUsize::new(successful_deletes),
            offline: AtomicBool::new(false),
        }
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DocumentStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DocumentStoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for FlakyStore {
    fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        self.check()?;
        self.inner.find_one(collection, id)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        self.check()?;
        self.inner.find(collection, filter, options)
    }

    fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError> {
        self.check()?;
        self.inner.insert_one(collection, document)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.check()?;
        self.inner.update_fields(collection, id, fields)
    }

    fn update_fields_where(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        self.check()?;
        self.inner.update_fields_where(collection, id, guard, fields)
    }

    fn delete_one(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        self.check()?;
        let allowed = self
            .deletes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(DocumentStoreError::Unavailable("delete timed out".to_string()));
        }
        self.inner.delete_one(collection, id)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DocumentStoreError> {
        self.check()?;
        self.inner.count(collection, filter)
    }
}
