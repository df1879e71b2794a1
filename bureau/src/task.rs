use std::fmt;
use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IssuanceError;

/// Unique identifier for an issuance task.
///
/// Uses UUID v7 for time-ordered uniqueness; shows up in office diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new task ID using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deferred producer of an [`IssuanceResult`], executed by the serving worker
/// after the simulated service delay.
pub type IssuanceWork = BoxFuture<'static, Result<IssuanceResult, IssuanceError>>;

/// Unit of work an office counter executes.
///
/// Carries no mutable state; it lives from submission until the serving
/// worker settles its completion.
pub struct IssuanceTask {
    /// Unique identifier for tracing.
    pub id: TaskId,
    /// Customer the document is issued for.
    pub customer_id: String,
    /// Document being issued.
    pub document_name: String,
    /// Deferred work body; consumed exactly once by the serving worker.
    pub work: IssuanceWork,
}

impl IssuanceTask {
    /// Create a task for the given customer and document.
    pub fn new(
        customer_id: impl Into<String>,
        document_name: impl Into<String>,
        work: IssuanceWork,
    ) -> Self {
        Self {
            id: TaskId::new(),
            customer_id: customer_id.into(),
            document_name: document_name.into(),
            work,
        }
    }
}

impl fmt::Debug for IssuanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuanceTask")
            .field("id", &self.id)
            .field("customer_id", &self.customer_id)
            .field("document_name", &self.document_name)
            .finish_non_exhaustive()
    }
}

/// Outcome of issuing one document for one customer. Immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssuanceResult {
    /// Customer the document was issued for.
    pub customer_id: String,
    /// Name of the issued document.
    pub document_name: String,
    /// Office that produced the document.
    pub issuing_office: String,
    /// Prerequisites the document was issued against.
    pub dependencies: Vec<String>,
    /// Measured service span (delay plus work), filled in by the worker.
    pub service_duration: Duration,
    /// When the result was produced.
    pub issued_at: DateTime<Utc>,
}

impl IssuanceResult {
    /// Create a result with a zero service duration; the worker measures and
    /// attaches the real span via [`IssuanceResult::with_service_duration`].
    pub fn new(
        customer_id: impl Into<String>,
        document_name: impl Into<String>,
        issuing_office: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            document_name: document_name.into(),
            issuing_office: issuing_office.into(),
            dependencies,
            service_duration: Duration::ZERO,
            issued_at: Utc::now(),
        }
    }

    /// Return a copy carrying the measured service duration.
    pub fn with_service_duration(mut self, duration: Duration) -> Self {
        self.service_duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_v7() {
        let id = TaskId::new();
        assert_eq!(id.0.as_bytes()[6] >> 4, 7);
    }

    #[test]
    fn with_service_duration_preserves_fields() {
        let result = IssuanceResult::new("u", "X", "A", vec!["W".to_string()])
            .with_service_duration(Duration::from_millis(42));
        assert_eq!(result.customer_id, "u");
        assert_eq!(result.document_name, "X");
        assert_eq!(result.issuing_office, "A");
        assert_eq!(result.dependencies, vec!["W".to_string()]);
        assert_eq!(result.service_duration, Duration::from_millis(42));
    }

    #[test]
    fn task_debug_elides_work() {
        let task = IssuanceTask::new("u", "X", Box::pin(async { Err(IssuanceError::Cancelled) }));
        let rendered = format!("{task:?}");
        assert!(rendered.contains("customer_id"));
        assert!(rendered.contains(".."));
    }
}
