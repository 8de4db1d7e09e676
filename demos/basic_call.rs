//! Basic example: configure a client from the environment and list projects.
//!
//! This example shows how to:
//! - Build a client from `SITEWORK_API_BASE_URL` / `SITEWORK_API_TIMEOUT_MS`
//! - Send an authenticated GET with pagination query parameters
//! - Create a resource with POST
//! - Read response metadata
//!
//! Run with: `SITEWORK_API_BASE_URL=http://localhost:8080 cargo run --example basic_call`

use serde::{Deserialize, Serialize};
use sitework_api::{ApiClient, ApiError, ClientBuilder, RequestOptions};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Project {
    id: String,
    name: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct ProjectPage {
    #[serde(rename = "data")]
    items: Vec<Project>,
    total: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProject {
    name: String,
    trading_partner_id: String,
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter("sitework_api=debug,basic_call=info")
        .init();

    let client: ApiClient = ClientBuilder::from_env()?.build()?;
    if let Ok(token) = std::env::var("SITEWORK_API_TOKEN") {
        client.set_access_token(Some(token));
    }

    println!("=== GET with pagination ===");
    let options = RequestOptions::default()
        .with_query_param("page", "1")
        .with_query_param("limit", "20")
        .with_query_param("sort", "updatedAt");
    let page = client.get_with::<ProjectPage>("/api/projects", options).await?;

    println!("{} project(s) in total", page.total);
    for project in &page.items {
        println!("  {} {}", project.id, project.name);
    }
    println!("Latency: {:?}, attempts: {}", page.latency, page.attempts);
    println!();

    println!("=== POST ===");
    let new_project = CreateProject {
        name: "Riverside Tower".to_string(),
        trading_partner_id: "tp-1".to_string(),
    };
    let created = client
        .post::<_, Project>("/api/projects", &new_project)
        .await?;
    println!("Created {} ({})", created.name, created.id);
    println!("Content-Type: {:?}", created.header("content-type"));
    println!("Was retried: {}", created.was_retried());

    Ok(())
}
