//! Error types for cluster API calls

use serde::Deserialize;
use thiserror::Error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Coarse classification shared by every error the SDK can return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No server URL configured locally
    Configuration,
    /// Missing or rejected credentials
    Authentication,
    /// Transport failure (DNS, TLS, refused connection, request timeout)
    Connectivity,
    /// Unknown node or guest id
    ResourceNotFound,
    /// A job was accepted but finished unsuccessfully
    TaskFailure,
    /// A bounded wait ran out of time
    Timeout,
    /// A wait was cancelled by the caller
    Cancelled,
    /// Anything else reported by the server
    Other,
}

/// Errors returned by the cluster API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP transport failed before a response was received
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The server answered with something that is not an API response
    #[error("Cannot reach cluster API at {url}: {message}")]
    Connectivity { url: String, message: String },

    /// Missing, expired or rejected session
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session valid but lacks the privilege
    #[error("Permission denied: {message}")]
    Authorization { message: String },

    /// Unknown node, VM or container
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The server rejected the parameters
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Any other non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The request could not be built from the given arguments
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The task completed with a non-OK exit status
    #[error("Task {upid} failed: {exit_status}")]
    TaskFailed { upid: String, exit_status: String },

    /// The bounded wait for a task elapsed
    #[error("Timed out after {seconds}s waiting for task {upid}")]
    Timeout { upid: String, seconds: u64 },

    /// The wait for a task was cancelled
    #[error("Stopped waiting for task {upid}")]
    Cancelled { upid: String },

    /// An error annotated with the operation and resource it belongs to
    #[error("{operation} {resource}: {source}")]
    Context {
        operation: String,
        resource: String,
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Wrap the error with the operation and resource identifier that produced it
    pub fn context(self, operation: impl Into<String>, resource: impl Into<String>) -> Self {
        ApiError::Context {
            operation: operation.into(),
            resource: resource.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through any added context
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::HttpClient(_) | ApiError::Connectivity { .. } => ErrorKind::Connectivity,
            ApiError::Authentication { .. } | ApiError::Authorization { .. } => {
                ErrorKind::Authentication
            }
            ApiError::NotFound { .. } => ErrorKind::ResourceNotFound,
            ApiError::TaskFailed { .. } => ErrorKind::TaskFailure,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Cancelled { .. } => ErrorKind::Cancelled,
            ApiError::Context { source, .. } => source.kind(),
            ApiError::BadRequest { .. }
            | ApiError::Server { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::InvalidRequest { .. } => ErrorKind::Other,
        }
    }

    /// The innermost error, with every context layer removed
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Error body returned by the cluster API
///
/// Failures come back as `{"data": null, "message": "...", "errors": {...}}`,
/// where `errors` maps parameter names to validation messages.
#[derive(Debug, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ErrorResponse {
    /// Flatten the body into a single line
    pub fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(message) = self.message.as_deref().map(str::trim) {
            if !message.is_empty() {
                parts.push(message.to_string());
            }
        }
        if let Some(errors) = &self.errors {
            for (field, value) in errors {
                let text = value
                    .as_str()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|| value.to_string());
                parts.push(format!("{field}: {text}"));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}
