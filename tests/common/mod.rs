//! Shared helpers for integration tests against a mock query service

use serde_json::{Value, json};
use wiremock::MockServer;

use nlquery::Config;

pub const TEST_API_KEY: &str = "test-key";

/// Configuration pointing at the mock server's `/api/v1`
pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}/api/v1/", server.uri()),
        api_key: Some(TEST_API_KEY.to_string()),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

/// `count` rows shaped like a customers table
pub fn customer_rows(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|n| json!({"customer_id": n, "name": format!("Customer {}", n), "total": n * 100}))
        .collect()
}
