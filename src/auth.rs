//! Access-token refresh hook.
//!
//! When a call comes back `401 Unauthorized` the client asks its
//! [`TokenRefresher`] for a new access token, stores it, and replays the call
//! once. The refresher owns its own retry and backoff; the client only sees
//! the final token or the final error.

use async_trait::async_trait;
use std::future::Future;

/// Error returned by a failed refresh.
pub type RefreshError = Box<dyn std::error::Error + Send + Sync>;

/// Produces a fresh access token.
///
/// Any `Fn() -> impl Future<Output = Result<String, RefreshError>>` closure
/// implements this trait.
///
/// # Examples
///
/// ```
/// use sitework_api::{auth::RefreshError, ApiClient};
///
/// # fn example() -> Result<(), sitework_api::ApiError> {
/// let client = ApiClient::builder()
///     .base_url("https://api.example.com")
///     .token_refresher(|| async {
///         // Call the refresh endpoint here.
///         Ok::<_, RefreshError>("new-token".to_string())
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtains a new access token.
    async fn refresh(&self) -> Result<String, RefreshError>;
}

#[async_trait]
impl<F, Fut> TokenRefresher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, RefreshError>> + Send,
{
    async fn refresh(&self) -> Result<String, RefreshError> {
        (self)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl TokenRefresher for Fixed {
        async fn refresh(&self) -> Result<String, RefreshError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_struct_refresher() {
        assert_eq!(Fixed("abc").refresh().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_closure_refresher() {
        let refresher = || async { Err::<String, RefreshError>("refresh token revoked".into()) };
        let err = refresher.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), "refresh token revoked");
    }
}
