//! Client for the natural-language query service
//!
//! [`QueryService`] is the raw request/response boundary; [`HttpQueryService`]
//! talks to the real service over HTTP. [`QueryClient`] sits on top of any
//! service and turns its answers into [`QueryExchange`] records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{NlQueryError, Result};
use crate::exchange::{QueryExchange, Row};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

/// Body returned by `POST /chat`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<Row>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateConversationResponse {
    conversation_id: Option<String>,
}

/// One message of a server-side conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    messages: Vec<TranscriptMessage>,
}

/// Request/response boundary to the remote query service
#[async_trait]
pub trait QueryService: Send + Sync {
    /// `POST /conversations`; fails with [`NlQueryError::SessionCreation`]
    async fn create_conversation(&self) -> Result<String>;

    /// `POST /chat`; fails with [`NlQueryError::Query`]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// `GET /history` (path configurable)
    async fn history(&self) -> Result<Vec<QueryExchange>>;

    /// `GET /conversations/{id}`
    async fn transcript(&self, _conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        Err(NlQueryError::Query(
            "Transcripts are not supported by this service".to_string(),
        ))
    }
}

/// HTTP implementation of [`QueryService`]
pub struct HttpQueryService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    history_path: String,
    timeout: Duration,
}

impl HttpQueryService {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NlQueryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key(),
            history_path: config.history_path.trim().trim_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn describe_transport_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!(
                "Request timed out after {} seconds",
                self.timeout.as_secs()
            )
        } else if error.is_connect() {
            format!("Could not reach query service at {}", self.base_url)
        } else {
            format!("Request to query service failed: {}", error)
        }
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: reqwest::RequestBuilder) -> std::result::Result<String, String> {
        let response = request
            .send()
            .await
            .map_err(|e| self.describe_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.describe_transport_error(&e))?;

        if !status.is_success() {
            return Err(match error_detail(&body) {
                Some(detail) => format!("Service returned {}: {}", status, detail),
                None => format!("Service returned {}", status),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn create_conversation(&self) -> Result<String> {
        let body = self
            .send(self.client.post(self.url("conversations")))
            .await
            .map_err(NlQueryError::SessionCreation)?;

        let parsed: CreateConversationResponse = serde_json::from_str(&body).map_err(|e| {
            NlQueryError::SessionCreation(format!("Invalid conversation payload: {}", e))
        })?;

        parsed
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                NlQueryError::SessionCreation("Response did not include a conversation_id".to_string())
            })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let builder = self
            .client
            .post(self.url("chat"))
            .header("X-API-Key", &self.api_key)
            .json(request);

        let body = self.send(builder).await.map_err(NlQueryError::Query)?;

        serde_json::from_str(&body)
            .map_err(|e| NlQueryError::Query(format!("Invalid response from query service: {}", e)))
    }

    async fn history(&self) -> Result<Vec<QueryExchange>> {
        let builder = self
            .client
            .get(self.url(&self.history_path))
            .header("X-API-Key", &self.api_key);

        let body = self.send(builder).await.map_err(NlQueryError::Query)?;

        serde_json::from_str(&body)
            .map_err(|e| NlQueryError::Query(format!("Invalid history payload: {}", e)))
    }

    async fn transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        let builder = self
            .client
            .get(self.url(&format!("conversations/{}", conversation_id)))
            .header("X-API-Key", &self.api_key);

        let body = self.send(builder).await.map_err(NlQueryError::Query)?;

        let parsed: TranscriptResponse = serde_json::from_str(&body)
            .map_err(|e| NlQueryError::Query(format!("Invalid transcript payload: {}", e)))?;
        Ok(parsed.messages)
    }
}

/// Pull a readable message out of an error body such as `{"detail": "..."}`
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.chars().take(200).collect());
    };

    let detail = value.get("detail").or_else(|| value.get("error"))?;
    match detail {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Object(inner) => inner
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .or_else(|| Some(detail.to_string())),
        other => Some(other.to_string()),
    }
}

/// Turns prompts into [`QueryExchange`] records via a [`QueryService`]
pub struct QueryClient<S: QueryService = HttpQueryService> {
    service: Arc<S>,
}

impl<S: QueryService> Clone for QueryClient<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl QueryClient<HttpQueryService> {
    /// Build a client that talks HTTP to the configured service
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(HttpQueryService::new(config)?))
    }
}

impl<S: QueryService> QueryClient<S> {
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &S {
        &self.service
    }

    /// Send one prompt and map the answer into an exchange
    ///
    /// The returned exchange always carries `prompt` exactly as given, not
    /// whatever the service echoes back.
    pub async fn submit(&self, prompt: &str, conversation_id: Option<&str>) -> Result<QueryExchange> {
        if prompt.trim().is_empty() {
            return Err(NlQueryError::EmptyInput);
        }

        let request = ChatRequest {
            message: prompt.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        };

        let response = self.service.chat(&request).await?;

        if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
            return Err(NlQueryError::Query(error));
        }

        Ok(QueryExchange::succeeded(
            response.id,
            prompt,
            response.sql.unwrap_or_default(),
            response.results.unwrap_or_default(),
            response.message,
        ))
    }

    pub async fn create_conversation(&self) -> Result<String> {
        self.service.create_conversation().await
    }

    pub async fn history(&self) -> Result<Vec<QueryExchange>> {
        self.service.history().await
    }

    pub async fn transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        self.service.transcript(conversation_id).await
    }
}
