//! Per-call request configuration.

use crate::{ApiError, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Options for a single logical call.
///
/// # Examples
///
/// ```
/// use sitework_api::RequestOptions;
/// use http::Method;
/// use serde_json::json;
///
/// // Optimistic-concurrency delete: the body carries the last-seen timestamp.
/// let options = RequestOptions::new(Method::DELETE)
///     .with_body(&json!({"updatedAt": "2025-01-02T00:00:00.000Z"}))
///     .unwrap();
/// assert!(options.body.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: Method,

    /// Headers overlaid on `Content-Type: application/json`.
    ///
    /// An `Authorization` header set here is replaced whenever the client
    /// holds an access token.
    pub headers: HeaderMap,

    /// JSON request body. `None` sends no body at all.
    pub body: Option<Value>,

    /// Per-attempt timeout. Falls back to the client-wide timeout.
    pub timeout: Option<Duration>,

    /// Forces zero retries for this call.
    pub disable_retry: bool,

    /// Query parameters appended URL-encoded to the resolved URL.
    pub query: Vec<(String, String)>,

    /// Whether a 401 triggers refresh-and-replay. Cleared on the replay
    /// itself, so a second 401 is surfaced instead of refreshed again.
    pub(crate) refresh_on_unauthorized: bool,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            disable_retry: false,
            query: Vec::new(),
            refresh_on_unauthorized: true,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ApiError::configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ApiError::configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `body` cannot be represented as JSON.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::serialization)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.disable_retry = true;
        self
    }

    /// Surfaces a 401 as-is instead of refreshing the token.
    ///
    /// Token refreshers that call the refresh endpoint through the same
    /// client use this so a rejected refresh cannot recurse. Such a refresher
    /// should reach the client through [`crate::ApiClient::downgrade`].
    pub fn without_token_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    /// The options for the single replay after a successful token refresh.
    pub(crate) fn for_replay(&self) -> Self {
        Self {
            disable_retry: true,
            refresh_on_unauthorized: false,
            ..self.clone()
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}
