//! Error types for the Promethium client.

use std::time::Duration;

use thiserror::Error;

use crate::models::WorkflowId;

/// Errors raised while resolving client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key in the explicit argument, environment, or config file.
    #[error("Promethium API key not found (pass --api-key, set PM_API_KEY, or run `promethium config credentials`)")]
    MissingApiKey,

    /// No base URL in the explicit argument, environment, or config file.
    #[error("Promethium base URL not found (pass --base-url, set PM_BASE_URL, or run `promethium config base-url`)")]
    MissingBaseUrl,

    /// The config file exists but could not be read or parsed.
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    /// The config file could not be written.
    #[error("Failed to write config file {path}: {message}")]
    Write { path: String, message: String },

    /// A resolved value cannot be used (e.g. not a valid header value).
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Errors that can occur in Promethium client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PromethiumError {
    /// Input was not valid base64, or decoded bytes were not valid text.
    #[error("Unable to base64-decode: {0}")]
    Decode(String),

    /// An artifact used an encoding this client does not understand.
    #[error("Artifact encoding '{0}' is not supported")]
    UnsupportedEncoding(String),

    /// The requested artifact is absent from a workflow result.
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The server returned 404 for a workflow.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// The server returned 404 for a file or directory.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The server returned any other non-2xx status.
    #[error("API error ({status}): {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or request body could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error during upload or download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Polling gave up before every workflow reached a terminal status.
    #[error("Timeout after {}s waiting for workflows to complete (still pending: {})", .elapsed.as_secs(), format_ids(.pending))]
    Timeout {
        elapsed: Duration,
        pending: Vec<WorkflowId>,
    },

    /// Client configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A workflow request failed its schema check before submission.
    #[error("Invalid workflow request: {0}")]
    Validation(String),

    /// A caller-supplied argument was rejected before any request was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PromethiumError {
    /// Whether this error maps a remote 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PromethiumError::WorkflowNotFound(_) | PromethiumError::FileNotFound(_)
        )
    }

    /// Whether polling gave up on the client side.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PromethiumError::Timeout { .. })
    }

    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PromethiumError::Transport { status, .. } => Some(*status),
            PromethiumError::WorkflowNotFound(_) | PromethiumError::FileNotFound(_) => Some(404),
            PromethiumError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a retry policy may re-issue the request that produced this error.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            PromethiumError::Http(_) => true,
            PromethiumError::Transport { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

fn format_ids(ids: &[WorkflowId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for Promethium operations.
pub type PromethiumResult<T> = Result<T, PromethiumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_display() {
        let err = ConfigError::MissingApiKey;
        assert!(err.to_string().contains("PM_API_KEY"));
    }

    #[test]
    fn test_missing_base_url_display() {
        let err = ConfigError::MissingBaseUrl;
        assert!(err.to_string().contains("PM_BASE_URL"));
    }

    #[test]
    fn test_transport_display_and_status() {
        let err = PromethiumError::Transport {
            status: 409,
            body: "workflow is running".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("workflow is running"));
        assert_eq!(err.status_code(), Some(409));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(PromethiumError::WorkflowNotFound("w1".into()).is_not_found());
        assert!(PromethiumError::FileNotFound("f1".into()).is_not_found());
        assert_eq!(
            PromethiumError::FileNotFound("f1".into()).status_code(),
            Some(404)
        );
    }

    #[test]
    fn test_timeout_lists_pending() {
        let err = PromethiumError::Timeout {
            elapsed: Duration::from_secs(5),
            pending: vec![WorkflowId::new("a"), WorkflowId::new("b")],
        };
        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("5s"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn test_retryable() {
        assert!(
            PromethiumError::Transport {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !PromethiumError::Transport {
                status: 409,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!PromethiumError::WorkflowNotFound("w".into()).is_retryable());
    }

    #[test]
    fn test_configuration_from() {
        let err: PromethiumError = ConfigError::MissingBaseUrl.into();
        assert!(matches!(
            err,
            PromethiumError::Configuration(ConfigError::MissingBaseUrl)
        ));
    }
}
