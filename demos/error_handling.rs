//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Branch on the status code and error category
//! - Tell apart two 409s with the machine-readable `code`
//! - Read RFC 7807 problem details and extension members
//! - Delete with an optimistic-concurrency body
//!
//! Run with: `SITEWORK_API_BASE_URL=http://localhost:8080 cargo run --example error_handling`

use http::Method;
use serde_json::{json, Value};
use sitework_api::{ClientBuilder, ErrorCategory, RequestOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sitework_api=info")
        .init();

    let client = ClientBuilder::from_env()?.build()?;

    println!("=== Example 1: Not found ===");
    match client.get::<Value>("/api/projects/does-not-exist").await {
        Ok(response) => println!("Success: {}", response.data),
        Err(e) => {
            println!("Status: {}", e.status_code());
            println!("Message: {}", e.message());
            println!("Category: {:?}", e.category());
            println!("Body: {:?}", e.response());
        }
    }
    println!();

    println!("=== Example 2: Duplicate name vs. concurrent update ===");
    let update = json!({
        "name": "Riverside Tower",
        "expectedUpdatedAt": "2025-01-02T00:00:00.000Z"
    });
    match client.put::<_, Value>("/api/projects/p-1", &update).await {
        Ok(_) => println!("Updated"),
        Err(e) if e.is_status(409) => match e.code() {
            Some("DUPLICATE_PROJECT_NAME") => {
                let name = e
                    .problem()
                    .and_then(|p| p.extension("projectName").cloned())
                    .unwrap_or(Value::Null);
                println!("Name {} is already taken", name);
            }
            Some("CONFLICT") => println!("Someone else changed this project, reload it"),
            other => println!("Conflict ({:?}): {}", other, e.message()),
        },
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Optimistic-concurrency delete ===");
    let options = RequestOptions::new(Method::DELETE)
        .with_body(&json!({"updatedAt": "2025-01-02T00:00:00.000Z"}))?;
    match client
        .delete_with::<()>("/api/estimate-requests/er-1", options)
        .await
    {
        Ok(_) => println!("Deleted"),
        Err(e) => match e.category() {
            ErrorCategory::Transport | ErrorCategory::Server => {
                println!("Backend unavailable after retries: {}", e)
            }
            ErrorCategory::Authentication => println!("Please sign in again"),
            ErrorCategory::Client | ErrorCategory::Other => println!("{}", e.message()),
        },
    }

    Ok(())
}
