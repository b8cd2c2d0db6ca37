//! Read-only settings consumed by the job store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::clock::{Clock, SystemClock};

/// Environment variable selecting the execution scope.
pub const ENV_EXECUTION_SCOPE: &str = "JOBKEEPER_EXECUTION_SCOPE";

/// Environment variable overriding the orphan reset window (milliseconds).
pub const ENV_RESET_EXPIRED_JOBS_MAX_TIMEOUT_MS: &str = "JOBKEEPER_RESET_EXPIRED_JOBS_MAX_TIMEOUT_MS";

/// Default orphan reset window: 24 hours.
pub const DEFAULT_MAX_RESET_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Which jobs an executor considers its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ExecutionScope {
    /// Process-engine jobs only (`scopeType` absent).
    #[default]
    Default,
    /// Jobs whose `scopeType` equals the given name.
    Named(String),
    /// Every job, regardless of `scopeType`.
    All,
}

impl ExecutionScope {
    /// Literal that selects [`ExecutionScope::All`].
    pub const ALL: &'static str = "all";

    /// Parse the configured scope: absent is `Default`, `"all"` is `All`,
    /// anything else names a scope.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Default,
            Some(Self::ALL) => Self::All,
            Some(name) => Self::Named(name.to_string()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for ExecutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionScope::Default => f.write_str("default"),
            ExecutionScope::Named(name) => f.write_str(name),
            ExecutionScope::All => f.write_str(Self::ALL),
        }
    }
}

/// Settings handed to the job store at construction time.
#[derive(Clone)]
pub struct JobStoreSettings {
    /// Scope used by eligibility and expiry lookups.
    pub execution_scope: ExecutionScope,
    /// How long a job may sit unleased before it is treated as orphaned.
    pub max_reset_timeout: Duration,
    /// Time source for expiry checks and insert timestamps.
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for JobStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStoreSettings")
            .field("execution_scope", &self.execution_scope)
            .field("max_reset_timeout", &self.max_reset_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for JobStoreSettings {
    fn default() -> Self {
        Self {
            execution_scope: ExecutionScope::Default,
            max_reset_timeout: DEFAULT_MAX_RESET_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }
}

impl JobStoreSettings {
    pub fn with_execution_scope(mut self, scope: ExecutionScope) -> Self {
        self.execution_scope = scope;
        self
    }

    pub fn with_max_reset_timeout(mut self, timeout: Duration) -> Self {
        self.max_reset_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults overlaid with `JOBKEEPER_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup` (keys as in [`Self::from_env`]).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        match lookup(ENV_EXECUTION_SCOPE) {
            Some(raw) => settings.execution_scope = ExecutionScope::parse(Some(raw.trim())),
            None => tracing::debug!("{ENV_EXECUTION_SCOPE} not set; using default scope"),
        }

        match lookup(ENV_RESET_EXPIRED_JOBS_MAX_TIMEOUT_MS) {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().with_context(|| {
                    format!("{ENV_RESET_EXPIRED_JOBS_MAX_TIMEOUT_MS} must be milliseconds, got '{raw}'")
                })?;
                settings.max_reset_timeout = Duration::from_millis(ms);
            }
            None => tracing::debug!(
                "{ENV_RESET_EXPIRED_JOBS_MAX_TIMEOUT_MS} not set; using {:?}",
                DEFAULT_MAX_RESET_TIMEOUT
            ),
        }

        Ok(settings)
    }
}
