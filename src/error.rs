//! Error type for API calls.
//!
//! Every terminal failure of a call surfaces as an [`ApiError`]. It carries an
//! HTTP-like status code (`0` for transport failures), a human-readable message
//! resolved from the response body, and the raw decoded body so callers can
//! branch on machine-readable discriminants such as `code`.

use crate::problem::ProblemDetails;
use crate::response::ResponseBody;
use http::StatusCode;

/// Status code used for failures that never produced an HTTP response.
pub const TRANSPORT_STATUS: u16 = 0;

/// Message used when a request could not reach the server.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Message used when an attempt was aborted by its timeout.
pub const TIMEOUT_MESSAGE: &str = "Request timeout";

/// What went wrong, independent of the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never reached the server (DNS, connection refused, reset).
    Network,
    /// The attempt exceeded its timeout.
    Timeout,
    /// The server answered with a non-2xx status.
    Status,
    /// The response body could not be decoded into the expected shape.
    Decode,
    /// The request body could not be serialized.
    Serialization,
    /// The client or request was misconfigured (bad URL, bad header).
    Configuration,
}

/// Coarse classification callers use to pick a user-facing reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Timeout or unreachable network (`status_code == 0`).
    Transport,
    /// 5xx, including cold-start and sleep-wake failures.
    Server,
    /// 401 that survived refresh-and-replay, or no refresher was configured.
    Authentication,
    /// Any other 4xx: validation, conflict, not found.
    Client,
    /// Decode, serialization and configuration failures.
    Other,
}

/// A failed API call.
///
/// # Examples
///
/// ```no_run
/// use sitework_api::{ApiClient, ApiError};
///
/// # async fn example(client: &ApiClient) -> Result<(), ApiError> {
/// match client.get::<serde_json::Value>("/api/projects/p-1").await {
///     Ok(project) => println!("{:?}", project.data),
///     Err(e) if e.is_status(409) && e.code() == Some("DUPLICATE_PROJECT_NAME") => {
///         eprintln!("name already taken: {}", e.message());
///     }
///     Err(e) if e.is_status(404) => eprintln!("{}", e.message()),
///     Err(e) => return Err(e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
#[error("{message} (status {status_code})")]
pub struct ApiError {
    status_code: u16,
    message: String,
    response: Option<ResponseBody>,
    kind: ErrorKind,
    #[source]
    source: Option<reqwest::Error>,
}

impl ApiError {
    /// Creates an error from its three public parts.
    ///
    /// The kind is [`ErrorKind::Network`] for status `0` and
    /// [`ErrorKind::Status`] otherwise. Use [`ApiError::timeout`] for a
    /// timed-out attempt.
    pub fn new(status_code: u16, message: impl Into<String>, response: Option<ResponseBody>) -> Self {
        let kind = if status_code == TRANSPORT_STATUS {
            ErrorKind::Network
        } else {
            ErrorKind::Status
        };
        Self {
            status_code,
            message: message.into(),
            response,
            kind,
            source: None,
        }
    }

    /// Creates the error reported when an attempt exceeds its timeout.
    ///
    /// Status `0`, message `"Request timeout"`, kind [`ErrorKind::Timeout`].
    pub fn timeout() -> Self {
        Self {
            status_code: TRANSPORT_STATUS,
            message: TIMEOUT_MESSAGE.to_string(),
            response: None,
            kind: ErrorKind::Timeout,
            source: None,
        }
    }

    /// Builds the error for a non-2xx response, resolving the message from the body.
    pub(crate) fn from_status(status: StatusCode, body: Option<ResponseBody>) -> Self {
        let message = resolve_message(body.as_ref(), status);
        Self::new(status.as_u16(), message, body)
    }

    /// Builds the error for an attempt that never produced a usable response.
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        let base = if error.is_timeout() {
            Self::timeout()
        } else {
            Self::new(TRANSPORT_STATUS, NETWORK_ERROR_MESSAGE, None)
        };
        Self {
            source: Some(error),
            ..base
        }
    }

    pub(crate) fn decode(status: StatusCode, message: impl Into<String>, body: Option<ResponseBody>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            response: body,
            kind: ErrorKind::Decode,
            source: None,
        }
    }

    pub(crate) fn serialization(error: serde_json::Error) -> Self {
        Self {
            status_code: TRANSPORT_STATUS,
            message: format!("Failed to serialize request body: {error}"),
            response: None,
            kind: ErrorKind::Serialization,
            source: None,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self {
            status_code: TRANSPORT_STATUS,
            message: message.into(),
            response: None,
            kind: ErrorKind::Configuration,
            source: None,
        }
    }

    /// The HTTP status code, or `0` when no response was received.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The resolved human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw decoded response body, if one was retrieved.
    pub fn response(&self) -> Option<&ResponseBody> {
        self.response.as_ref()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the error has the given status code.
    pub fn is_status(&self, status_code: u16) -> bool {
        self.status_code == status_code
    }

    /// Returns `true` for timeouts and unreachable networks.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Timeout)
    }

    /// Returns `true` if another attempt could succeed.
    ///
    /// Only transport failures and status responses are candidates; among
    /// those the decision is [`crate::retry::is_retryable_status`].
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Status
        ) && crate::retry::is_retryable_status(self.status_code)
    }

    pub fn category(&self) -> ErrorCategory {
        match (self.kind, self.status_code) {
            (ErrorKind::Network | ErrorKind::Timeout, _) => ErrorCategory::Transport,
            (ErrorKind::Status, 401) => ErrorCategory::Authentication,
            (ErrorKind::Status, 400..=499) => ErrorCategory::Client,
            (ErrorKind::Status, 500..=599) => ErrorCategory::Server,
            _ => ErrorCategory::Other,
        }
    }

    /// The machine-readable `code` field of a JSON error body.
    ///
    /// Used to tell apart errors sharing one status, e.g. an optimistic
    /// concurrency conflict and a duplicate name, both `409`.
    pub fn code(&self) -> Option<&str> {
        self.response.as_ref()?.get_str("code")
    }

    /// An RFC 7807 view of the error body, if it is a JSON object.
    pub fn problem(&self) -> Option<ProblemDetails> {
        ProblemDetails::from_body(self.response.as_ref()?)
    }
}

/// Picks the message for an error response: `detail`, then `error`, then the
/// status reason phrase.
pub(crate) fn resolve_message(body: Option<&ResponseBody>, status: StatusCode) -> String {
    if let Some(body) = body {
        if let Some(detail) = body.get_str("detail") {
            return detail.to_string();
        }
        if let Some(error) = body.get_str("error") {
            return error.to_string();
        }
    }
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}

/// A specialized `Result` type for API calls.
pub type Result<T> = std::result::Result<T, ApiError>;
