//! Snapshot diffing for partial updates.
//!
//! Only lease and retry bookkeeping is mutable after insert. Correlation and
//! structural fields are write-once: changing them on a loaded record has no
//! effect on the store.

use jobkeeper_docstore::{Document, FieldValue};

use crate::record::{JobRecord, fields};

/// Fields a partial update may touch.
pub const TRACKED_FIELDS: [&str; 4] = [
    fields::RETRIES,
    fields::EXCEPTION_MESSAGE,
    fields::LOCK_OWNER,
    fields::LOCK_EXPIRATION_TIME,
];

/// `{field: live value}` for every tracked field whose live value differs from
/// `snapshot`. A missing key on either side counts as null.
pub fn diff(live: &Document, snapshot: &Document, tracked: &[&str]) -> Document {
    tracked
        .iter()
        .filter_map(|&field| {
            let now = live.get(field).unwrap_or(&FieldValue::Null);
            let was = snapshot.get(field).unwrap_or(&FieldValue::Null);
            (now != was).then(|| (field.to_string(), now.clone()))
        })
        .collect()
}

/// Changed tracked fields of `record` relative to its snapshot.
pub fn dirty_fields(record: &JobRecord) -> Document {
    diff(&record.to_document(), record.original_state(), &TRACKED_FIELDS)
}
