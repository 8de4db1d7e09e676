//! Example wiring a token refresher that calls the refresh endpoint.
//!
//! The refresher calls back into the same client through a weak handle, so
//! the client and its refresher do not keep each other alive. Its own request
//! opts out of refresh-and-replay so an expired refresh cookie fails cleanly
//! instead of recursing.
//!
//! Run with: `SITEWORK_API_BASE_URL=http://localhost:8080 cargo run --example token_refresh`

use serde::Deserialize;
use serde_json::Value;
use sitework_api::auth::RefreshError;
use sitework_api::{ClientBuilder, RequestOptions, WeakApiClient};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

async fn refresh_access_token(client: WeakApiClient) -> Result<String, RefreshError> {
    let client = client.upgrade().ok_or("client was dropped")?;
    // The refresh cookie travels in the client's cookie store.
    let options = RequestOptions::default().without_token_refresh();
    let response = client
        .post_with::<TokenResponse>("/api/auth/refresh", options)
        .await?;
    Ok(response.into_data().access_token)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sitework_api=debug")
        .init();

    let client = ClientBuilder::from_env()?.build()?;

    let handle = client.downgrade();
    client.set_token_refresher(move || refresh_access_token(handle.clone()));

    client.set_access_token(Some("expired-token".to_string()));

    let me = client.get::<Value>("/api/auth/me").await?;
    println!("Signed in as {}", me.data);
    println!("Attempts (including replay): {}", me.attempts);

    Ok(())
}
