//! Ad-hoc correlation query.

/// Filter jobs by correlation keys. Unset keys do not constrain the result,
/// so an empty query matches every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
}

impl JobQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn process_instance_id(mut self, process_instance_id: impl Into<String>) -> Self {
        self.process_instance_id = Some(process_instance_id.into());
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.execution_id.is_none() && self.process_instance_id.is_none()
    }
}
