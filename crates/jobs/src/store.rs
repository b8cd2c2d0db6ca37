//! Job persistence surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use jobkeeper_core::JobId;

use crate::error::JobStoreError;
use crate::query::JobQuery;
use crate::record::JobRecord;

/// Job store abstraction.
///
/// Callers own a [`JobRecord`] for one load-mutate-update cycle. The lease
/// fields are the only concurrency guard between executors sharing a store.
pub trait JobStore: Send + Sync {
    /// New record with a fresh id and an empty snapshot. Nothing is persisted.
    fn create(&self) -> JobRecord;

    /// Get a job by ID.
    fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError>;

    /// Persist a new job. Stamps `createTime` if unset and resets the snapshot.
    fn insert(&self, record: &mut JobRecord) -> Result<(), JobStoreError>;

    /// Write the changed lease/retry fields. Returns `false` when nothing
    /// changed (no store round-trip).
    ///
    /// The write has no precondition on the stored document: two callers
    /// updating the same loaded job both succeed and the last write wins.
    /// Use [`JobStore::acquire_lease`] to take a lease safely.
    fn update(&self, record: &mut JobRecord) -> Result<bool, JobStoreError>;

    /// Set `lockOwner`/`lockExpirationTime` only if the job was loaded
    /// unleased or with a lapsed lease, and the stored lease is still the one
    /// observed at load time. A job whose observed lease has not yet expired
    /// is refused without a write. Either refusal is `NotFound` and leaves the
    /// record's lease fields as they were.
    fn acquire_lease(
        &self,
        record: &mut JobRecord,
        owner: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError>;

    /// Delete by id. Deleting a missing job succeeds.
    fn delete(&self, id: JobId) -> Result<(), JobStoreError>;

    /// Delete a loaded record; the record is consumed.
    fn delete_record(&self, record: JobRecord) -> Result<(), JobStoreError>;

    /// Unleased jobs in the configured scope, store-native order, at most `page_limit`.
    fn find_jobs_to_execute(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError>;

    /// Lapsed-lease and orphaned jobs in the configured scope, at most `page_limit`.
    fn find_expired_jobs(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError>;

    fn find_by_execution_id(&self, execution_id: &str) -> Result<Vec<JobRecord>, JobStoreError>;

    fn find_by_process_instance_id(
        &self,
        process_instance_id: &str,
    ) -> Result<Vec<JobRecord>, JobStoreError>;

    /// Jobs matching `query`. An empty query returns every job.
    fn find_by_correlation(&self, query: &JobQuery) -> Result<Vec<JobRecord>, JobStoreError>;

    /// Number of jobs matching `query`, without loading them.
    fn count_by_correlation(&self, query: &JobQuery) -> Result<u64, JobStoreError>;

    /// Delete every job of an execution, one by one.
    ///
    /// Not atomic: if a deletion fails, the ones before it stay committed.
    /// Retrying is safe. Returns the number of jobs deleted.
    fn delete_by_execution_id(&self, execution_id: &str) -> Result<usize, JobStoreError>;

    /// Not supported; always `Unsupported`.
    fn reset_expired_job(&self, id: JobId) -> Result<(), JobStoreError>;

    /// Not supported; always `Unsupported`.
    fn update_tenant_id_for_deployment(
        &self,
        deployment_id: &str,
        new_tenant_id: &str,
    ) -> Result<(), JobStoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn create(&self) -> JobRecord {
        (**self).create()
    }

    fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        (**self).find_by_id(id)
    }

    fn insert(&self, record: &mut JobRecord) -> Result<(), JobStoreError> {
        (**self).insert(record)
    }

    fn update(&self, record: &mut JobRecord) -> Result<bool, JobStoreError> {
        (**self).update(record)
    }

    fn acquire_lease(
        &self,
        record: &mut JobRecord,
        owner: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        (**self).acquire_lease(record, owner, expires_at)
    }

    fn delete(&self, id: JobId) -> Result<(), JobStoreError> {
        (**self).delete(id)
    }

    fn delete_record(&self, record: JobRecord) -> Result<(), JobStoreError> {
        (**self).delete_record(record)
    }

    fn find_jobs_to_execute(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError> {
        (**self).find_jobs_to_execute(page_limit)
    }

    fn find_expired_jobs(&self, page_limit: usize) -> Result<Vec<JobRecord>, JobStoreError> {
        (**self).find_expired_jobs(page_limit)
    }

    fn find_by_execution_id(&self, execution_id: &str) -> Result<Vec<JobRecord>, JobStoreError> {
        (**self).find_by_execution_id(execution_id)
    }

    fn find_by_process_instance_id(
        &self,
        process_instance_id: &str,
    ) -> Result<Vec<JobRecord>, JobStoreError> {
        (**self).find_by_process_instance_id(process_instance_id)
    }

    fn find_by_correlation(&self, query: &JobQuery) -> Result<Vec<JobRecord>, JobStoreError> {
        (**self).find_by_correlation(query)
    }

    fn count_by_correlation(&self, query: &JobQuery) -> Result<u64, JobStoreError> {
        (**self).count_by_correlation(query)
    }

    fn delete_by_execution_id(&self, execution_id: &str) -> Result<usize, JobStoreError> {
        (**self).delete_by_execution_id(execution_id)
    }

    fn reset_expired_job(&self, id: JobId) -> Result<(), JobStoreError> {
        (**self).reset_expired_job(id)
    }

    fn update_tenant_id_for_deployment(
        &self,
        deployment_id: &str,
        new_tenant_id: &str,
    ) -> Result<(), JobStoreError> {
        (**self).update_tenant_id_for_deployment(deployment_id, new_tenant_id)
    }
}
