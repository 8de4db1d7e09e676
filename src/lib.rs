//! # sitework-api - typed REST client core
//!
//! The HTTP layer behind the site-work project management application. Every
//! call to the backend (projects, trading partners, quantity tables, estimate
//! requests, quotations, site surveys, invitations, roles) goes through one
//! [`ApiClient`], which handles:
//!
//! - **Bearer authentication** - the stored access token is sent with every request
//! - **Refresh and replay** - a `401` triggers one token refresh and one replay of the call
//! - **Bounded retries** - transport failures, timeouts and 5xx are retried with capped
//!   exponential backoff
//! - **Problem details** - error messages come from RFC 7807 `detail`, then `error`
//! - **Typed results** - JSON and text bodies decode into the caller's type
//! - **Structured logging** - `tracing` events per attempt, never including the token
//!
//! ## Quick Start
//!
//! ```no_run
//! use sitework_api::{auth::RefreshError, ApiClient, RetryConfig};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Project {
//!     id: String,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sitework_api::ApiError> {
//!     let client = ApiClient::builder()
//!         .base_url("https://api.example.com")
//!         .timeout(Duration::from_secs(30))
//!         .retry_config(RetryConfig::default())
//!         .token_refresher(|| async {
//!             // Exchange the refresh cookie for a new access token here.
//!             Ok::<_, RefreshError>("fresh-token".to_string())
//!         })
//!         .build()?;
//!
//!     client.set_access_token(Some("initial-token".to_string()));
//!
//!     let project = client.get::<Project>("/api/projects/p-1").await?;
//!     println!("{}: {}", project.id, project.name);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every terminal failure is an [`ApiError`]. Branch on the status code and,
//! for errors that share one, on the machine-readable `code`:
//!
//! ```no_run
//! use sitework_api::{ApiClient, ErrorCategory, RequestOptions};
//! use http::Method;
//! use serde_json::json;
//!
//! # async fn example(client: &ApiClient) -> Result<(), sitework_api::ApiError> {
//! let options = RequestOptions::new(Method::DELETE)
//!     .with_body(&json!({"updatedAt": "2025-01-02T00:00:00.000Z"}))?;
//!
//! match client.delete_with::<()>("/api/estimate-requests/er-1", options).await {
//!     Ok(_) => println!("deleted"),
//!     Err(e) if e.is_status(409) && e.code() == Some("CONFLICT") => {
//!         println!("changed by someone else: {}", e.message());
//!     }
//!     Err(e) if e.category() == ErrorCategory::Transport => {
//!         println!("offline, try again later");
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
mod error;
mod options;
pub mod problem;
mod response;
pub mod retry;
pub mod sleep;

pub use auth::TokenRefresher;
pub use client::{
    ApiClient, ClientBuilder, WeakApiClient, BASE_URL_ENV, DEFAULT_TIMEOUT, TIMEOUT_ENV,
};
pub use error::{ApiError, ErrorCategory, ErrorKind, Result};
pub use options::RequestOptions;
pub use problem::ProblemDetails;
pub use response::{Response, ResponseBody};
pub use retry::{is_retryable_status, RetryConfig};
pub use sleep::{InstantSleeper, Sleeper, TokioSleeper};
