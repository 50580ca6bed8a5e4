use thiserror::Error;

/// Result type alias for task management operations
pub type Result<T> = std::result::Result<T, TaskMgmtError>;

/// Message fragment the API returns when concurrent status writes collide.
/// Requests failing with it are safe to replay.
pub const TRANSACTION_CANCELLED: &str = "Database transaction was cancelled";

/// Error types for the task management resource layer.
///
/// These errors cover every failure mode of the proxies, the status graph
/// reconciler and the resource CRUD functions. Each variant maps to an HTTP
/// status code equivalent and is classified as retryable or not, which is
/// what the poll loop in [`crate::retry`] keys off.
///
/// # Examples
///
/// ```rust
/// use taskmgmt_core::error::TaskMgmtError;
///
/// let missing = TaskMgmtError::not_found("worktype", "wt-1");
/// assert!(missing.is_not_found());
/// assert!(missing.is_retryable());
/// assert_eq!(missing.status_code(), 404);
///
/// let unresolved = TaskMgmtError::unresolved_status("Closed", "Claims");
/// assert!(!unresolved.is_retryable());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskMgmtError {
    /// Entity not found by the given identifier or name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request never produced a response (connect, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Desired configuration is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A status reference names a status that is not part of the worktype
    #[error("Status '{status}' is not defined in worktype '{worktype}'")]
    UnresolvedStatus { status: String, worktype: String },

    /// A composite id did not have the `<worktypeId>/<childId>` shape
    #[error("Invalid composite id '{0}': expected <worktypeId>/<childId>")]
    InvalidCompositeId(String),

    /// A poll loop ran out of time; carries the last retryable error
    #[error("Timed out after {elapsed_secs}s: {last_error}")]
    Timeout {
        elapsed_secs: u64,
        last_error: Box<TaskMgmtError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal system error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskMgmtError {
    /// Create a not found error for an entity id or name
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound(format!("{entity} '{key}' not found"))
    }

    /// Create a not found error for a name lookup that scanned every page
    pub fn name_not_found(entity: &str, name: &str) -> Self {
        Self::NotFound(format!("no {entity} found with name '{name}'"))
    }

    /// Create an unresolved status reference error
    pub fn unresolved_status(status: &str, worktype: &str) -> Self {
        Self::UnresolvedStatus {
            status: status.to_string(),
            worktype: worktype.to_string(),
        }
    }

    /// Create a validation error for an empty field
    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("Field '{field}' cannot be empty"))
    }

    /// Create an API error from a status code and body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Prefix the message with what was being attempted.
    ///
    /// The variant is kept so retry classification still applies.
    pub fn context(self, context: &str) -> Self {
        match self {
            TaskMgmtError::NotFound(msg) => TaskMgmtError::NotFound(format!("{context}: {msg}")),
            TaskMgmtError::Api { status, message } => TaskMgmtError::Api {
                status,
                message: format!("{context}: {message}"),
            },
            TaskMgmtError::Transport(msg) => TaskMgmtError::Transport(format!("{context}: {msg}")),
            TaskMgmtError::Validation(msg) => TaskMgmtError::Validation(format!("{context}: {msg}")),
            TaskMgmtError::Serialization(msg) => {
                TaskMgmtError::Serialization(format!("{context}: {msg}"))
            }
            TaskMgmtError::Internal(msg) => TaskMgmtError::Internal(format!("{context}: {msg}")),
            TaskMgmtError::Timeout {
                elapsed_secs,
                last_error,
            } => TaskMgmtError::Timeout {
                elapsed_secs,
                last_error: Box::new(last_error.context(context)),
            },
            other => other,
        }
    }

    /// Check if this error indicates a not found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            TaskMgmtError::NotFound(_) => true,
            TaskMgmtError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Check if a poll loop gave up while the entity was still missing
    pub fn is_timeout_on_not_found(&self) -> bool {
        matches!(self, TaskMgmtError::Timeout { last_error, .. } if last_error.is_not_found())
    }

    /// Check if this error indicates a validation problem
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TaskMgmtError::Validation(_)
                | TaskMgmtError::UnresolvedStatus { .. }
                | TaskMgmtError::InvalidCompositeId(_)
        )
    }

    /// Whether a poll loop should try the same call again.
    ///
    /// Not-found is retryable because the API is eventually consistent.
    /// Throttling and cancelled status transactions are replayable; every
    /// other API error is a hard failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskMgmtError::NotFound(_) => true,
            TaskMgmtError::Api { status, message } => {
                *status == 404
                    || *status == 429
                    || (*status == 400 && message.contains(TRANSACTION_CANCELLED))
            }
            _ => false,
        }
    }

    /// Convert to appropriate HTTP status code equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            TaskMgmtError::NotFound(_) => 404,
            TaskMgmtError::Api { status, .. } => *status,
            TaskMgmtError::Validation(_) => 400,
            TaskMgmtError::UnresolvedStatus { .. } => 422,
            TaskMgmtError::InvalidCompositeId(_) => 400,
            TaskMgmtError::Timeout { .. } => 408,
            TaskMgmtError::Transport(_) => 503,
            TaskMgmtError::Configuration(_) => 500,
            TaskMgmtError::Serialization(_) => 500,
            TaskMgmtError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for TaskMgmtError {
    fn from(err: serde_json::Error) -> Self {
        TaskMgmtError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TaskMgmtError::not_found("workbin", "wb-42");
        assert_eq!(
            error,
            TaskMgmtError::NotFound("workbin 'wb-42' not found".to_string())
        );
        assert!(error.is_not_found());
        assert_eq!(error.status_code(), 404);

        let error = TaskMgmtError::name_not_found("worktype", "Claims");
        assert_eq!(
            error,
            TaskMgmtError::NotFound("no worktype found with name 'Claims'".to_string())
        );

        let error = TaskMgmtError::empty_field("name");
        assert!(error.is_validation());
        assert_eq!(error.status_code(), 400);

        let error = TaskMgmtError::unresolved_status("Closed", "Claims");
        assert!(error.is_validation());
        assert_eq!(error.status_code(), 422);
    }

    #[test]
    fn test_error_display() {
        let error = TaskMgmtError::unresolved_status("Rejected", "Approvals");
        assert_eq!(
            format!("{error}"),
            "Status 'Rejected' is not defined in worktype 'Approvals'"
        );

        let error = TaskMgmtError::api(409, "duplicate name");
        assert_eq!(format!("{error}"), "API error (409): duplicate name");

        let error = TaskMgmtError::Timeout {
            elapsed_secs: 15,
            last_error: Box::new(TaskMgmtError::name_not_found("workbin", "Inbox")),
        };
        assert_eq!(
            format!("{error}"),
            "Timed out after 15s: Not found: no workbin found with name 'Inbox'"
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(TaskMgmtError::NotFound("x".to_string()).is_retryable());
        assert!(TaskMgmtError::api(404, "gone").is_retryable());
        assert!(TaskMgmtError::api(429, "slow down").is_retryable());
        assert!(TaskMgmtError::api(400, TRANSACTION_CANCELLED).is_retryable());

        assert!(!TaskMgmtError::api(400, "bad request").is_retryable());
        assert!(!TaskMgmtError::api(500, "boom").is_retryable());
        assert!(!TaskMgmtError::Transport("refused".to_string()).is_retryable());
        assert!(!TaskMgmtError::unresolved_status("A", "W").is_retryable());
    }

    #[test]
    fn test_context_keeps_classification() {
        let error = TaskMgmtError::api(400, TRANSACTION_CANCELLED).context("failed to link status 'Open'");
        assert!(error.is_retryable());
        assert_eq!(
            error.to_string(),
            format!("API error (400): failed to link status 'Open': {TRANSACTION_CANCELLED}")
        );

        let error = TaskMgmtError::unresolved_status("A", "W").context("ignored");
        assert_eq!(error, TaskMgmtError::unresolved_status("A", "W"));
    }

    #[test]
    fn test_timeout_on_not_found() {
        let timeout = TaskMgmtError::Timeout {
            elapsed_secs: 1,
            last_error: Box::new(TaskMgmtError::api(404, "gone")),
        };
        assert!(timeout.is_timeout_on_not_found());
        assert!(!timeout.is_not_found());

        let timeout = TaskMgmtError::Timeout {
            elapsed_secs: 1,
            last_error: Box::new(TaskMgmtError::api(429, "slow down")),
        };
        assert!(!timeout.is_timeout_on_not_found());
    }
}
