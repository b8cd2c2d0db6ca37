//! Persisted job shape.

use chrono::{DateTime, Utc};
use serde::Serialize;

use jobkeeper_core::JobId;
use jobkeeper_docstore::{Document, FieldValue, ID_FIELD};

use crate::error::JobStoreError;

/// Persisted field names.
pub mod fields {
    pub use jobkeeper_docstore::ID_FIELD as ID;
    pub const EXECUTION_ID: &str = "executionId";
    pub const PROCESS_INSTANCE_ID: &str = "processInstanceId";
    pub const SCOPE_TYPE: &str = "scopeType";
    pub const RETRIES: &str = "retries";
    pub const EXCEPTION_MESSAGE: &str = "exceptionMessage";
    pub const LOCK_OWNER: &str = "lockOwner";
    pub const LOCK_EXPIRATION_TIME: &str = "lockExpirationTime";
    pub const CREATE_TIME: &str = "createTime";
    pub const TENANT_ID: &str = "tenantId";
}

/// Retries a freshly created job starts with.
pub const DEFAULT_RETRIES: i32 = 3;

/// One asynchronous unit of work.
///
/// Alongside the live values a record carries the snapshot of what was last
/// read from or written to the store. Only the store sets the snapshot;
/// `JobStore::update` diffs against it to decide what to write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    id: JobId,
    execution_id: Option<String>,
    process_instance_id: Option<String>,
    scope_type: Option<String>,
    retries: i32,
    exception_message: Option<String>,
    lock_owner: Option<String>,
    lock_expiration_time: Option<DateTime<Utc>>,
    create_time: Option<DateTime<Utc>>,
    tenant_id: Option<String>,
    #[serde(skip)]
    original: Document,
}

impl JobRecord {
    /// New, never persisted record with an empty snapshot.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            execution_id: None,
            process_instance_id: None,
            scope_type: None,
            retries: DEFAULT_RETRIES,
            exception_message: None,
            lock_owner: None,
            lock_expiration_time: None,
            create_time: None,
            tenant_id: None,
            original: Document::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn set_execution_id(&mut self, execution_id: Option<String>) {
        self.execution_id = execution_id;
    }

    pub fn process_instance_id(&self) -> Option<&str> {
        self.process_instance_id.as_deref()
    }

    pub fn set_process_instance_id(&mut self, process_instance_id: Option<String>) {
        self.process_instance_id = process_instance_id;
    }

    /// `None` means the process-engine scope.
    pub fn scope_type(&self) -> Option<&str> {
        self.scope_type.as_deref()
    }

    pub fn set_scope_type(&mut self, scope_type: Option<String>) {
        self.scope_type = scope_type;
    }

    pub fn retries(&self) -> i32 {
        self.retries
    }

    pub fn set_retries(&mut self, retries: i32) {
        self.retries = retries;
    }

    pub fn exception_message(&self) -> Option<&str> {
        self.exception_message.as_deref()
    }

    pub fn set_exception_message(&mut self, message: Option<String>) {
        self.exception_message = message;
    }

    pub fn lock_owner(&self) -> Option<&str> {
        self.lock_owner.as_deref()
    }

    pub fn set_lock_owner(&mut self, owner: Option<String>) {
        self.lock_owner = owner;
    }

    pub fn lock_expiration_time(&self) -> Option<DateTime<Utc>> {
        self.lock_expiration_time
    }

    pub fn set_lock_expiration_time(&mut self, at: Option<DateTime<Utc>>) {
        self.lock_expiration_time = at;
    }

    /// Set once, at insert.
    pub fn create_time(&self) -> Option<DateTime<Utc>> {
        self.create_time
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn set_tenant_id(&mut self, tenant_id: Option<String>) {
        self.tenant_id = tenant_id;
    }

    /// Whether a lease is currently recorded (expired or not).
    pub fn is_leased(&self) -> bool {
        self.lock_expiration_time.is_some()
    }

    /// Field values as last persisted; empty for a record never stored.
    pub fn original_state(&self) -> &Document {
        &self.original
    }

    pub(crate) fn stamp_create_time(&mut self, at: DateTime<Utc>) {
        self.create_time.get_or_insert(at);
    }

    pub(crate) fn reset_snapshot(&mut self, snapshot: Document) {
        self.original = snapshot;
    }

    /// Fold a successful partial write into the snapshot.
    pub(crate) fn merge_into_snapshot(&mut self, written: &Document) {
        for (field, value) in written {
            self.original.insert(field.clone(), value.clone());
        }
    }

    /// Live values as a document. Absent optionals are omitted.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_string(), FieldValue::Str(self.id.to_string()));
        doc.insert(fields::RETRIES.to_string(), FieldValue::Int(i64::from(self.retries)));

        let optional: [(&str, FieldValue); 8] = [
            (fields::EXECUTION_ID, self.execution_id.clone().into()),
            (fields::PROCESS_INSTANCE_ID, self.process_instance_id.clone().into()),
            (fields::SCOPE_TYPE, self.scope_type.clone().into()),
            (fields::EXCEPTION_MESSAGE, self.exception_message.clone().into()),
            (fields::LOCK_OWNER, self.lock_owner.clone().into()),
            (fields::LOCK_EXPIRATION_TIME, self.lock_expiration_time.into()),
            (fields::CREATE_TIME, self.create_time.into()),
            (fields::TENANT_ID, self.tenant_id.clone().into()),
        ];
        for (field, value) in optional {
            if !value.is_null() {
                doc.insert(field.to_string(), value);
            }
        }
        doc
    }

    /// Decode a stored document; the document becomes the snapshot, with
    /// `retries` as decoded.
    pub(crate) fn from_document(doc: Document) -> Result<Self, JobStoreError> {
        let raw_id = doc
            .get(ID_FIELD)
            .and_then(FieldValue::as_str)
            .ok_or_else(|| JobStoreError::corrupt("", "document has no id"))?;
        let id: JobId = raw_id
            .parse()
            .map_err(|e: jobkeeper_core::DomainError| JobStoreError::corrupt(raw_id, e.to_string()))?;

        let decoder = Decoder { doc: &doc, id: raw_id };
        let retries = match decoder.int(fields::RETRIES)? {
            Some(v) => i32::try_from(v)
                .map_err(|_| JobStoreError::corrupt(raw_id, format!("retries out of range: {v}")))?,
            None => 0,
        };

        let mut record = Self {
            id,
            execution_id: decoder.string(fields::EXECUTION_ID)?,
            process_instance_id: decoder.string(fields::PROCESS_INSTANCE_ID)?,
            scope_type: decoder.string(fields::SCOPE_TYPE)?,
            retries,
            exception_message: decoder.string(fields::EXCEPTION_MESSAGE)?,
            lock_owner: decoder.string(fields::LOCK_OWNER)?,
            lock_expiration_time: decoder.timestamp(fields::LOCK_EXPIRATION_TIME)?,
            create_time: decoder.timestamp(fields::CREATE_TIME)?,
            tenant_id: decoder.string(fields::TENANT_ID)?,
            original: Document::new(),
        };
        record.original = doc;
        // A defaulted `retries` must not show up as a change on the next update.
        record
            .original
            .insert(fields::RETRIES.to_string(), FieldValue::Int(i64::from(retries)));
        Ok(record)
    }
}

struct Decoder<'a> {
    doc: &'a Document,
    id: &'a str,
}

impl Decoder<'_> {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.doc.get(name).filter(|v| !v.is_null())
    }

    fn mismatch(&self, name: &str, expected: &str) -> JobStoreError {
        JobStoreError::corrupt(self.id, format!("{name}: expected {expected}"))
    }

    fn string(&self, name: &str) -> Result<Option<String>, JobStoreError> {
        self.field(name)
            .map(|v| v.as_str().map(str::to_string).ok_or_else(|| self.mismatch(name, "string")))
            .transpose()
    }

    fn int(&self, name: &str) -> Result<Option<i64>, JobStoreError> {
        self.field(name)
            .map(|v| v.as_int().ok_or_else(|| self.mismatch(name, "integer")))
            .transpose()
    }

    fn timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, JobStoreError> {
        self.field(name)
            .map(|v| v.as_timestamp().ok_or_else(|| self.mismatch(name, "timestamp")))
            .transpose()
    }
}
