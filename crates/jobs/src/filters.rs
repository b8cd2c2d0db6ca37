//! Job predicates.
//!
//! Each function builds one independent clause; [`Filter::and`]/[`Filter::or`]
//! combine them. None of them touch a store.

use std::time::Duration;

use chrono::{DateTime, Utc};

use jobkeeper_core::ExecutionScope;
use jobkeeper_docstore::Filter;

use crate::query::JobQuery;
use crate::record::fields;

/// `scopeType` clause for an execution scope. `All` does not constrain.
pub fn scope(scope: &ExecutionScope) -> Filter {
    match scope {
        ExecutionScope::Default => Filter::is_absent(fields::SCOPE_TYPE),
        ExecutionScope::Named(name) => Filter::eq(fields::SCOPE_TYPE, name.as_str()),
        ExecutionScope::All => Filter::All,
    }
}

/// The job carries no lease.
pub fn unleased() -> Filter {
    Filter::is_absent(fields::LOCK_EXPIRATION_TIME)
}

/// Jobs that may be leased now: unleased and within scope.
pub fn executable(execution_scope: &ExecutionScope) -> Filter {
    Filter::and([scope(execution_scope), unleased()])
}

/// Latest `createTime` an unleased job may have and still count as orphaned.
///
/// A timeout too large to subtract yields the earliest representable instant,
/// so no job qualifies.
pub fn orphan_cutoff(now: DateTime<Utc>, max_reset_timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_reset_timeout)
        .ok()
        .and_then(|timeout| now.checked_sub_signed(timeout))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Jobs within scope whose lease lapsed before `now`, or that were never
/// leased and were created before `now - max_reset_timeout`.
pub fn expired(
    execution_scope: &ExecutionScope,
    now: DateTime<Utc>,
    max_reset_timeout: Duration,
) -> Filter {
    let lapsed = Filter::lt(fields::LOCK_EXPIRATION_TIME, now);
    let orphaned = Filter::and([
        unleased(),
        Filter::lt(fields::CREATE_TIME, orphan_cutoff(now, max_reset_timeout)),
    ]);
    Filter::and([scope(execution_scope), Filter::or([lapsed, orphaned])])
}

/// Conjunction of the correlation keys set on `query`.
pub fn correlation(query: &JobQuery) -> Filter {
    let execution = query
        .execution_id
        .as_deref()
        .map(|id| Filter::eq(fields::EXECUTION_ID, id));
    let process_instance = query
        .process_instance_id
        .as_deref()
        .map(|id| Filter::eq(fields::PROCESS_INSTANCE_ID, id));
    Filter::and(execution.into_iter().chain(process_instance))
}
