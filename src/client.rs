//! HTTP client with bearer auth, token refresh and bounded retries.
//!
//! The [`ApiClient`] type is the entry point for every backend call. Build one
//! at startup with [`ClientBuilder`] and pass clones of it to whatever needs
//! to talk to the backend; clones share configuration and the access token.

use crate::{
    auth::TokenRefresher,
    options::RequestOptions,
    response::ResponseBody,
    retry::{RetryConfig, RetryState, Transition},
    sleep::{Sleeper, TokioSleeper},
    ApiError, ErrorKind, Response, Result,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant};
use url::Url;

/// Environment variable read by [`ClientBuilder::from_env`] for the base URL.
pub const BASE_URL_ENV: &str = "SITEWORK_API_BASE_URL";

/// Environment variable read by [`ClientBuilder::from_env`] for the timeout in milliseconds.
pub const TIMEOUT_ENV: &str = "SITEWORK_API_TIMEOUT_MS";

/// Client-wide per-attempt timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for the project management backend.
///
/// Every call funnels through [`ApiClient::request`]: headers are built, the
/// attempt is sent with a timeout, the response is classified, transient
/// failures are retried with backoff, and a `401` triggers one
/// refresh-and-replay cycle when a [`TokenRefresher`] is configured.
///
/// # Examples
///
/// ```no_run
/// use sitework_api::ApiClient;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct CreateProject {
///     name: String,
/// }
///
/// #[derive(Deserialize)]
/// struct Project {
///     id: String,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), sitework_api::ApiError> {
/// let client = ApiClient::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// client.set_access_token(Some("token".to_string()));
///
/// let project = client.get::<Project>("/api/projects/p-1").await?;
/// println!("Project: {}", project.name);
///
/// let created = client
///     .post::<_, Project>("/api/projects", &CreateProject { name: "Tower A".into() })
///     .await?;
/// println!("Created {}", created.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    sleeper: Arc<dyn Sleeper>,
    state: RwLock<ClientState>,
    /// Held while the refresher runs, so concurrent 401s refresh once.
    refresh_gate: tokio::sync::Mutex<()>,
}

/// Mutable configuration. Read and written in short critical sections that
/// never span an `.await`.
struct ClientState {
    base_url: String,
    timeout: Duration,
    access_token: Option<String>,
    token_refresher: Option<Arc<dyn TokenRefresher>>,
    retry_config: RetryConfig,
}

/// A successful physical attempt.
struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

/// Result of one run of the retry loop.
struct Attempts {
    result: Result<Exchange>,
    attempts: usize,
    /// Token sent with the last attempt.
    token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a handle that does not keep the client alive.
    ///
    /// A token refresher installed on this client must not hold a strong
    /// clone of it: the client owns the refresher, and the cycle would keep
    /// both (and the connection pool) alive forever.
    pub fn downgrade(&self) -> WeakApiClient {
        WeakApiClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the base URL that request paths are appended to.
    pub fn set_base_url(&self, base_url: impl Into<String>) {
        self.state_mut().base_url = base_url.into();
    }

    pub fn base_url(&self) -> String {
        self.state().base_url.clone()
    }

    /// Sets the default per-attempt timeout.
    pub fn set_timeout(&self, timeout: Duration) {
        self.state_mut().timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.state().timeout
    }

    /// Sets or clears the bearer token sent with every request.
    pub fn set_access_token(&self, token: Option<String>) {
        self.state_mut().access_token = token;
    }

    /// The current bearer token.
    pub fn access_token(&self) -> Option<String> {
        self.state().access_token.clone()
    }

    /// Installs the hook invoked when a call comes back `401`.
    pub fn set_token_refresher(&self, refresher: impl TokenRefresher + 'static) {
        self.state_mut().token_refresher = Some(Arc::new(refresher));
    }

    /// Removes the refresh hook; a `401` then fails the call directly.
    pub fn clear_token_refresher(&self) {
        self.state_mut().token_refresher = None;
    }

    pub fn has_token_refresher(&self) -> bool {
        self.state().token_refresher.is_some()
    }

    pub fn set_retry_config(&self, config: RetryConfig) {
        self.state_mut().retry_config = config;
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.state().retry_config.clone()
    }

    /// Makes a typed request.
    ///
    /// This is the single entry point behind every verb method. It handles
    /// header injection, retries, refresh-and-replay, and decoding.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for every terminal failure: transport failures
    /// and timeouts (`status_code == 0`) after the retry budget is spent,
    /// non-2xx responses, and bodies that do not decode into `T`.
    pub async fn request<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let start_time = Instant::now();
        let url = self.resolve_url(path, &options)?;

        let first = self.run_attempts(&url, &options).await;
        let mut attempts = first.attempts;
        let result = match first.result {
            Err(error)
                if error.kind() == ErrorKind::Status
                    && error.is_status(401)
                    && options.refresh_on_unauthorized =>
            {
                match self.refresh_and_replay(&url, &options, first.token, error).await {
                    Ok(replay) => {
                        attempts += replay.attempts;
                        replay.result
                    }
                    Err(error) => Err(error),
                }
            }
            result => result,
        };
        let exchange = result?;

        let latency = start_time.elapsed();
        tracing::info!(
            status = exchange.status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        let data = exchange.body.to_typed::<T>().map_err(|e| {
            tracing::error!(error = %e, status = exchange.status.as_u16(), "Failed to decode response");
            ApiError::decode(
                exchange.status,
                format!("Failed to decode response: {}", e),
                Some(exchange.body.clone()),
            )
        })?;

        Ok(Response::new(
            data,
            exchange.status,
            exchange.headers,
            latency,
            attempts,
        ))
    }

    /// Drives the attempt state machine until success, failure, or exhaustion.
    async fn run_attempts(&self, url: &Url, options: &RequestOptions) -> Attempts {
        let retry_config = self.retry_config();
        let mut state = RetryState::new(retry_config, options.disable_retry);

        loop {
            let token = self.access_token();
            let outcome = self
                .execute_attempt(url, options, token.as_deref(), state.attempts() + 1)
                .await;

            match state.transition(outcome) {
                Transition::Success(exchange) => {
                    return Attempts {
                        result: Ok(exchange),
                        attempts: state.attempts(),
                        token,
                    };
                }
                Transition::RetryAfter { delay, error } => {
                    tracing::warn!(
                        error = %error,
                        attempt = state.attempts(),
                        method = %options.method,
                        url = %url,
                        "Request failed"
                    );
                    tracing::info!(
                        delay_ms = delay.as_millis(),
                        attempt = state.attempts(),
                        "Retrying request after delay"
                    );
                    self.inner.sleeper.sleep(delay).await;
                }
                Transition::Fail(error) => {
                    tracing::warn!(
                        error = %error,
                        attempt = state.attempts(),
                        method = %options.method,
                        url = %url,
                        "Request failed"
                    );
                    return Attempts {
                        result: Err(error),
                        attempts: state.attempts(),
                        token,
                    };
                }
            }
        }
    }

    /// Handles a `401`: obtain a new token and replay the call once.
    ///
    /// Refreshes are single-flight: callers queue on the refresh gate, and a
    /// caller that finds the token replaced since its rejected attempt
    /// replays with it instead of refreshing again.
    ///
    /// Returns `Err` with the original `401` when no refresher is configured
    /// or the refresher fails.
    async fn refresh_and_replay(
        &self,
        url: &Url,
        options: &RequestOptions,
        sent_token: Option<String>,
        unauthorized: ApiError,
    ) -> Result<Attempts> {
        let refresher = self.state().token_refresher.clone();
        let Some(refresher) = refresher else {
            return Err(unauthorized);
        };

        {
            let _gate = self.inner.refresh_gate.lock().await;
            let current = self.access_token();
            if current.is_some() && current != sent_token {
                // Another call already swapped the token since this one was sent.
                tracing::debug!("Access token changed since the rejected attempt, replaying");
            } else {
                match refresher.refresh().await {
                    Ok(token) => {
                        tracing::info!("Access token refreshed, replaying request");
                        self.set_access_token(Some(token));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, url = %url, "Token refresh failed");
                        return Err(unauthorized);
                    }
                }
            }
        }

        Ok(self.run_attempts(url, &options.for_replay()).await)
    }

    /// Sends one physical attempt and classifies the response.
    async fn execute_attempt(
        &self,
        url: &Url,
        options: &RequestOptions,
        token: Option<&str>,
        attempt: usize,
    ) -> Result<Exchange> {
        let timeout = options.timeout.unwrap_or_else(|| self.timeout());
        let headers = self.build_headers(&options.headers, token)?;

        tracing::debug!(
            method = %options.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(options.method.clone(), url.clone())
            .headers(headers)
            .timeout(timeout);

        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body).map_err(ApiError::serialization)?;
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;

        if !status.is_success() && bytes.is_empty() {
            return Err(self.status_error(status, None));
        }

        let body = ResponseBody::decode(&headers, &bytes).map_err(|e| {
            tracing::error!(error = %e, status = status.as_u16(), "Failed to decode response body");
            ApiError::decode(status, format!("Failed to decode response body: {}", e), None)
        })?;

        if status.is_success() {
            Ok(Exchange {
                status,
                headers,
                body,
            })
        } else {
            Err(self.status_error(status, Some(body)))
        }
    }

    fn status_error(&self, status: StatusCode, body: Option<ResponseBody>) -> ApiError {
        let error = ApiError::from_status(status, body);
        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                message = %error.message(),
                "Client error (4xx)"
            );
        } else if status.is_server_error() {
            tracing::warn!(
                status = status.as_u16(),
                message = %error.message(),
                "Server error (5xx)"
            );
        }
        error
    }

    /// Layers headers: client defaults, `Content-Type: application/json`,
    /// caller headers, then `Authorization` when a token is held.
    fn build_headers(&self, caller: &HeaderMap, token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in caller {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(token) = token {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token))
                .map_err(|_| ApiError::configuration("Access token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Appends `path` to the base URL verbatim, then the query parameters.
    fn resolve_url(&self, path: &str, options: &RequestOptions) -> Result<Url> {
        let raw = format!("{}{}", self.state().base_url, path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::configuration(format!("Invalid URL {}: {}", raw, e)))?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }
        Ok(url)
    }

    /// Makes a GET request to the specified path.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sitework_api::ApiClient;
    /// use serde_json::Value;
    ///
    /// # async fn example(client: &ApiClient) -> Result<(), sitework_api::ApiError> {
    /// let partners = client.get::<Value>("/api/trading-partners?page=1&limit=20").await?;
    /// println!("{}", partners.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T>(&self, path: &str) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, RequestOptions::new(Method::GET)).await
    }

    /// Makes a GET request with explicit options.
    pub async fn get_with<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, with_method(options, Method::GET)).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::POST).with_body(body)?;
        self.request(path, options).await
    }

    /// Makes a POST request with explicit options. Without `options.body`
    /// no body is sent.
    pub async fn post_with<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, with_method(options, Method::POST)).await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::PUT).with_body(body)?;
        self.request(path, options).await
    }

    pub async fn put_with<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, with_method(options, Method::PUT)).await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::PATCH).with_body(body)?;
        self.request(path, options).await
    }

    pub async fn patch_with<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, with_method(options, Method::PATCH)).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<T>(&self, path: &str) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }

    /// Makes a DELETE request with explicit options.
    ///
    /// Endpoints guarded by optimistic concurrency take the last-seen
    /// `updatedAt` in `options.body`.
    pub async fn delete_with<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(path, with_method(options, Method::DELETE)).await
    }
}

fn with_method(mut options: RequestOptions, method: Method) -> RequestOptions {
    options.method = method;
    options
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ApiClient")
            .field("base_url", &state.base_url)
            .field("timeout", &state.timeout)
            .field("has_access_token", &state.access_token.is_some())
            .field("has_token_refresher", &state.token_refresher.is_some())
            .field("retry_config", &state.retry_config)
            .finish()
    }
}

/// A non-owning handle to an [`ApiClient`], created by [`ApiClient::downgrade`].
#[derive(Clone, Debug)]
pub struct WeakApiClient {
    inner: Weak<ClientInner>,
}

impl WeakApiClient {
    /// Returns the client if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<ApiClient> {
        self.inner.upgrade().map(|inner| ApiClient { inner })
    }
}

/// Builder for configuring and creating an [`ApiClient`].
///
/// # Examples
///
/// ```no_run
/// use sitework_api::{ClientBuilder, RetryConfig};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), sitework_api::ApiError> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(30))
///     .retry_config(RetryConfig::default().with_max_retries(5))
///     .default_header("X-Client", "sitework-web")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    timeout: Duration,
    access_token: Option<String>,
    token_refresher: Option<Arc<dyn TokenRefresher>>,
    retry_config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
    cookie_store: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            access_token: None,
            token_refresher: None,
            retry_config: RetryConfig::default(),
            sleeper: Arc::new(TokioSleeper),
            cookie_store: true,
        }
    }

    /// Starts from the environment: base URL from [`BASE_URL_ENV`] and,
    /// when set, the timeout from [`TIMEOUT_ENV`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL variable is missing or
    /// the timeout is not a whole number of milliseconds.
    pub fn from_env() -> Result<Self> {
        let builder = Self::new().base_url_from_env(BASE_URL_ENV)?;
        match std::env::var(TIMEOUT_ENV) {
            Ok(raw) => {
                let millis = raw.trim().parse::<u64>().map_err(|e| {
                    ApiError::configuration(format!("Invalid {}: {}", TIMEOUT_ENV, e))
                })?;
                Ok(builder.timeout(Duration::from_millis(millis)))
            }
            Err(_) => Ok(builder),
        }
    }

    /// Sets the base URL all request paths are appended to.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Reads the base URL from an environment variable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is unset or not unicode.
    pub fn base_url_from_env(self, var: &str) -> Result<Self> {
        let url = std::env::var(var).map_err(|e| {
            ApiError::configuration(format!("Cannot read base URL from {}: {}", var, e))
        })?;
        Ok(self.base_url(url))
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ApiError::configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ApiError::configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the initial bearer token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the hook invoked when a call comes back `401`.
    pub fn token_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.token_refresher = Some(Arc::new(refresher));
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Replaces the delay used between retries.
    ///
    /// Tests pass [`crate::sleep::InstantSleeper`] to skip real waiting.
    pub fn sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Keeps cookies set by the backend and sends them back (on by default).
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Builds the configured `ApiClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, the base URL does not
    /// parse, or the HTTP client cannot be built.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::configuration("Base URL is required"))?;
        Url::parse(&base_url).map_err(|e| {
            ApiError::configuration(format!("Invalid base URL {}: {}", base_url, e))
        })?;

        let http_client = reqwest::Client::builder()
            .cookie_store(self.cookie_store)
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http_client,
                default_headers: self.default_headers,
                sleeper: self.sleeper,
                state: RwLock::new(ClientState {
                    base_url,
                    timeout: self.timeout,
                    access_token: self.access_token,
                    token_refresher: self.token_refresher,
                    retry_config: self.retry_config,
                }),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::builder()
            .base_url("http://localhost:8080")
            .build()
            .unwrap()
    }

    #[test]
    fn test_weak_handle_does_not_keep_client_alive() {
        let client = client();
        let weak = client.downgrade();

        let upgraded = weak.upgrade().unwrap();
        upgraded.set_access_token(Some("shared".to_string()));
        assert_eq!(client.access_token().as_deref(), Some("shared"));
        drop(upgraded);

        drop(client);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_refresher_holding_weak_handle_allows_drop() {
        let client = client();
        let weak = client.downgrade();
        let handle = client.downgrade();
        client.set_token_refresher(move || {
            let upgraded = handle.upgrade();
            async move {
                upgraded
                    .and_then(|c| c.access_token())
                    .ok_or_else(|| crate::auth::RefreshError::from("client dropped"))
            }
        });

        drop(client);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_build_requires_base_url() {
        let err = ClientBuilder::new().build().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_build_rejects_invalid_base_url() {
        let err = ClientBuilder::new().base_url("not a url").build().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert!(err.message().contains("not a url"));
    }

    #[test]
    fn test_resolve_url_concatenates() {
        let client = client();
        let url = client
            .resolve_url("/api/projects", &RequestOptions::default())
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/projects");

        client.set_base_url("http://localhost:8080/");
        let url = client
            .resolve_url("/api/projects", &RequestOptions::default())
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080//api/projects");
    }

    #[test]
    fn test_resolve_url_encodes_query() {
        let options = RequestOptions::default()
            .with_query_param("search", "東京 タワー")
            .with_query_param("page", "2");
        let url = client().resolve_url("/api/projects", &options).unwrap();
        assert_eq!(url.query(), Some("search=%E6%9D%B1%E4%BA%AC+%E3%82%BF%E3%83%AF%E3%83%BC&page=2"));
    }

    #[test]
    fn test_header_layering() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8080")
            .default_header("X-Client", "web")
            .unwrap()
            .build()
            .unwrap();

        let caller = RequestOptions::default()
            .with_header("X-Request-Id", "abc")
            .unwrap()
            .with_header("Authorization", "Bearer caller")
            .unwrap()
            .headers;

        let headers = client.build_headers(&caller, Some("t")).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-client").unwrap(), "web");
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer t");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());

        let headers = client.build_headers(&HeaderMap::new(), None).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_caller_content_type_wins() {
        let caller = RequestOptions::default()
            .with_header("Content-Type", "application/merge-patch+json")
            .unwrap()
            .headers;
        let headers = client().build_headers(&caller, None).unwrap();
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/merge-patch+json"
        );
    }

    #[test]
    fn test_setters() {
        let client = client();
        assert_eq!(client.access_token(), None);
        client.set_access_token(Some("abc".into()));
        assert_eq!(client.access_token().as_deref(), Some("abc"));

        let clone = client.clone();
        clone.set_access_token(None);
        assert_eq!(client.access_token(), None);

        client.set_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout(), Duration::from_secs(5));

        assert!(!client.has_token_refresher());
        client.set_token_refresher(|| async { Ok::<_, crate::auth::RefreshError>("x".to_string()) });
        assert!(client.has_token_refresher());
        client.clear_token_refresher();
        assert!(!client.has_token_refresher());
    }

    #[test]
    fn test_debug_hides_token() {
        let client = client();
        client.set_access_token(Some("super-secret".into()));
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("has_access_token: true"));
    }
}
