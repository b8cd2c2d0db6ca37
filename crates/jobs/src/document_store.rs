//! `JobStore` over any [`DocumentStore`].

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use jobkeeper_core::{Clock, JobId, JobStoreSettings};
use jobkeeper_docstore::{DocumentStore, FieldValue, Filter, FindOptions};

use crate::dirty;
use crate::error::JobStoreError;
use crate::filters;
use crate::query::JobQuery;
use crate::record::{JobRecord, fields};
use crate::store::JobStore;

/// Collection holding job documents.
pub const COLLECTION_JOBS: &str = "jobs";

/// Job store backed by a document collection.
pub struct DocumentJobStore<S> {
    store: S,
    settings: JobStoreSettings,
}

impl<S: DocumentStore> DocumentJobStore<S> {
    pub fn new(store: S, settings: JobStoreSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &JobStoreSettings {
        &self.settings
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn find_many(&self, filter: &Filter, options: FindOptions) -> Result<Vec<JobRecord>, JobStoreError> {
        self.store
            .find(COLLECTION_JOBS, filter, options)?
            .into_iter()
            .map(JobRecord::from_document)
            .collect()
    }
}

impl<S: DocumentStore> JobStore for DocumentJobStore<S> {
    fn create(&self) -> JobRecord {
        JobRecord::new(JobId::new())
    }

    fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        debug!(job_id = %id, "loading job");
        self.store
            .find_one(COLLECTION_JOBS, &id.to_string())?
            .map(JobRecord::from_document)
            .transpose()
    }

    fn insert(&self, record: &mut JobRecord) -> Result<(), JobStoreError> {
        record.stamp_create_time(self.settings.clock.now());
        let doc = record.to_document();
        self.store.insert_one(COLLECTION_JOBS, doc.clone())?;
        record.reset_snapshot(doc);

        debug!(
            job_id = %record.id(),
            execution_id = ?record.execution_id(),
            scope_type = ?record.scope_type(),
            "inserted job"
        );
        Ok(())
    }

    fn update(&self, record: &mut JobRecord) -> Result<bool, JobStoreError> {
        let id = record.id();
        let changed = dirty::dirty_fields(record);
        if changed.is_empty() {
            debug!(job_id = %id, "job unchanged; skipping update");
            return Ok(false);
        }

        let names: Vec<&str> = changed.keys().map(String::as_str).collect();
        debug!(job_id = %id, fields = ?names, "updating job");
        self.store
            .update_fields(COLLECTION_JOBS, &id.to_string(), changed.clone())?;
        record.merge_into_snapshot(&changed);
        Ok(true)
    }

    fn acquire_lease(
        &self,
        record: &mut JobRecord,
        owner: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        let id = record.id();
        let observed = record
            .original_state()
            .get(fields::LOCK_EXPIRATION_TIME)
            .cloned()
            .unwrap_or(FieldValue::Null);

        let now = self.settings.clock.now();
        if let Some(held_until) = observed.as_timestamp().filter(|until| *until >= now) {
            warn!(job_id = %id, lock_owner = owner, %held_until, "lease still held; not acquired");
            return Err(JobStoreError::NotFound(id));
        }
        let guard = Filter::Eq(fields::LOCK_EXPIRATION_TIME.to_string(), observed);

        let previous_owner = record.lock_owner().map(str::to_string);
        let previous_expiration = record.lock_expiration_time();
        record.set_lock_owner(Some(owner.to_string()));
        record.set_lock_expiration_time(Some(expires_at));

        let changed = dirty::dirty_fields(record);
        if changed.is_empty() {
            return Ok(());
        }

        match self
            .store
            .update_fields_where(COLLECTION_JOBS, &id.to_string(), &guard, changed.clone())
        {
            Ok(()) => {
                record.merge_into_snapshot(&changed);
                info!(job_id = %id, lock_owner = owner, %expires_at, "lease acquired");
                Ok(())
            }
            Err(err) => {
                record.set_lock_owner(previous_owner);
                record.set_lock_expiration_time(previous_expiration);
                warn!(job_id = %id, lock_owner = owner, error = %err, "lease not acquired");
                Err(err.into())
            }
        }
    }

    fn delete(&self, id: JobId) -> Result<(), JobStoreError> {
        self.store.delete_one(COLLECTION_JOBS, &id.to_string())?;
        debug!(job_id = %id, "deleted job");
        Ok(())
    }

    fn delete_record(&self, record: JobRecord) -> Result<(), JobStoreError> {
        self.delete(record.id())
    }

    fn find_jobs_to_execute(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError> {
        let filter = filters::executable(&self.settings.execution_scope);
        self.find_many(&filter, FindOptions::limit(page_limit))
    }

    fn find_expired_jobs(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError> {
        let filter = filters::expired(
            &self.settings.execution_scope,
            self.settings.clock.now(),
            self.settings.max_reset_timeout,
        );
        self.find_many(&filter, FindOptions::limit(page_limit))
    }

    fn find_by_execution_id(&self, execution_id: &str) -> Result<Vec<JobRecord>, JobStoreError> {
        self.find_by_correlation(&JobQuery::new().execution_id(execution_id))
    }

    fn find_by_process_instance_id(
        &self,
        process_instance_id: &str,
    ) -> Result<Vec<JobRecord>, JobStoreError> {
        self.find_by_correlation(&JobQuery::new().process_instance_id(process_instance_id))
    }

    fn find_by_correlation(&self, query: &JobQuery) -> Result<Vec<JobRecord>, JobStoreError> {
        if query.is_unconstrained() {
            debug!("unconstrained job query; returning every job");
        }
        self.find_many(&filters::correlation(query), FindOptions::default())
    }

    fn count_by_correlation(&self, query: &JobQuery) -> Result<u64, JobStoreError> {
        Ok(self
            .store
            .count(COLLECTION_JOBS, &filters::correlation(query))?)
    }

    fn delete_by_execution_id(&self, execution_id: &str) -> Result<usize, JobStoreError> {
        let jobs = self.find_by_execution_id(execution_id)?;
        let mut deleted = 0;
        for job in jobs {
            self.delete_record(job)?;
            deleted += 1;
        }
        info!(execution_id, deleted, "deleted jobs of execution");
        Ok(deleted)
    }

    fn reset_expired_job(&self, id: JobId) -> Result<(), JobStoreError> {
        warn!(job_id = %id, "reset_expired_job called on a store that does not support it");
        Err(JobStoreError::Unsupported("reset_expired_job"))
    }

    fn update_tenant_id_for_deployment(
        &self,
        deployment_id: &str,
        new_tenant_id: &str,
    ) -> Result<(), JobStoreError> {
        warn!(
            deployment_id,
            new_tenant_id,
            "update_tenant_id_for_deployment called on a store that does not support it"
        );
        Err(JobStoreError::Unsupported("update_tenant_id_for_deployment"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use jobkeeper_core::ManualClock;
    use jobkeeper_docstore::InMemoryDocumentStore;

    use super::*;

    fn setup() -> (DocumentJobStore<InMemoryDocumentStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let settings = JobStoreSettings::default().with_clock(clock.clone());
        (DocumentJobStore::new(InMemoryDocumentStore::new(), settings), clock)
    }

    #[test]
    fn create_does_not_persist() {
        let (jobs, _) = setup();
        let job = jobs.create();
        assert!(job.original_state().is_empty());
        assert!(jobs.find_by_id(job.id()).unwrap().is_none());
    }

    #[test]
    fn insert_then_find_round_trips() {
        let (jobs, clock) = setup();
        let mut job = jobs.create();
        job.set_process_instance_id(Some("p1".into()));
        job.set_tenant_id(Some("acme".into()));
        jobs.insert(&mut job).unwrap();

        assert_eq!(job.create_time(), Some(clock.now()));
        assert_eq!(job.original_state(), &job.to_document());

        let loaded = jobs.find_by_id(job.id()).unwrap().unwrap();
        assert_eq!(loaded, job);
        assert_eq!(loaded.execution_id(), None);
        assert_eq!(loaded.lock_owner(), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (jobs, _) = setup();
        let mut job = jobs.create();
        jobs.insert(&mut job).unwrap();

        let mut again = job.clone();
        assert_eq!(
            jobs.insert(&mut again),
            Err(JobStoreError::DuplicateKey(job.id()))
        );
    }

    #[test]
    fn update_of_vanished_job_is_not_found() {
        let (jobs, _) = setup();
        let mut job = jobs.create();
        jobs.insert(&mut job).unwrap();
        jobs.delete(job.id()).unwrap();

        job.set_retries(1);
        assert_eq!(jobs.update(&mut job), Err(JobStoreError::NotFound(job.id())));
    }

    #[test]
    fn update_resets_snapshot() {
        let (jobs, _) = setup();
        let mut job = jobs.create();
        jobs.insert(&mut job).unwrap();

        job.set_retries(2);
        job.set_exception_message(Some("boom".into()));
        assert!(jobs.update(&mut job).unwrap());
        assert!(!jobs.update(&mut job).unwrap());

        let loaded = jobs.find_by_id(job.id()).unwrap().unwrap();
        assert_eq!(loaded.retries(), 2);
        assert_eq!(loaded.exception_message(), Some("boom"));
    }

    #[test]
    fn delete_twice_is_fine() {
        let (jobs, _) = setup();
        let mut job = jobs.create();
        jobs.insert(&mut job).unwrap();

        jobs.delete(job.id()).unwrap();
        jobs.delete(job.id()).unwrap();
        assert!(jobs.find_by_id(job.id()).unwrap().is_none());
    }

    #[test]
    fn unsupported_operations_say_so() {
        let (jobs, _) = setup();
        assert_eq!(
            jobs.reset_expired_job(JobId::new()),
            Err(JobStoreError::Unsupported("reset_expired_job"))
        );
        assert_eq!(
            jobs.update_tenant_id_for_deployment("d1", "acme"),
            Err(JobStoreError::Unsupported("update_tenant_id_for_deployment"))
        );
    }

    #[test]
    fn empty_store_yields_empty_pages() {
        let (jobs, _) = setup();
        assert!(jobs.find_jobs_to_execute(10).unwrap().is_empty());
        assert!(jobs.find_expired_jobs(10).unwrap().is_empty());
        assert_eq!(jobs.count_by_correlation(&JobQuery::new()).unwrap(), 0);
    }
}
