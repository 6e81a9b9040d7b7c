//! Conversation id plus the ordered exchanges recorded under it

use crate::client::{QueryClient, QueryService};
use crate::error::Result;
use crate::exchange::QueryExchange;

/// A conversation with the query service and the exchanges made within it
///
/// Exchanges are append-only and kept in insertion order, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    conversation_id: Option<String>,
    exchanges: Vec<QueryExchange>,
}

impl ConversationSession {
    /// Ask the service for a new conversation id
    ///
    /// Fails with `SessionCreation` when the service is unreachable or
    /// answers with an unusable payload. Not retried.
    pub async fn create<S: QueryService>(client: &QueryClient<S>) -> Result<Self> {
        let conversation_id = client.create_conversation().await?;
        tracing::info!(%conversation_id, "Created conversation");
        Ok(Self {
            conversation_id: Some(conversation_id),
            exchanges: Vec::new(),
        })
    }

    /// A session without a conversation id; the service is queried statelessly
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Add an exchange at the end. An id already present is ignored.
    ///
    /// Returns whether the exchange was added.
    pub fn append(&mut self, exchange: QueryExchange) -> bool {
        if self.find(&exchange.id).is_some() {
            tracing::warn!(id = %exchange.id, "Ignoring exchange with duplicate id");
            return false;
        }
        self.exchanges.push(exchange);
        true
    }

    pub fn latest(&self) -> Option<&QueryExchange> {
        self.exchanges.last()
    }

    pub fn find(&self, id: &str) -> Option<&QueryExchange> {
        self.exchanges.iter().find(|exchange| exchange.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.exchanges.iter().position(|exchange| exchange.id == id)
    }

    pub fn exchanges(&self) -> &[QueryExchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlQueryError;
    use crate::test_utils::ScriptedService;

    fn exchange(id: &str) -> QueryExchange {
        QueryExchange::succeeded(Some(id.to_string()), format!("prompt {}", id), "", Vec::new(), None)
    }

    #[tokio::test]
    async fn test_create_sets_conversation_id() {
        let client = QueryClient::new(ScriptedService::new().with_conversation_id("abc-123"));
        let session = ConversationSession::create(&client).await.unwrap();
        assert_eq!(session.conversation_id(), Some("abc-123"));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_create_fails_when_service_unreachable() {
        let client = QueryClient::new(ScriptedService::new().with_conversation_error("refused"));
        let err = ConversationSession::create(&client).await.unwrap_err();
        assert!(matches!(err, NlQueryError::SessionCreation(_)));
    }

    #[test]
    fn test_detached_has_no_conversation_id() {
        let session = ConversationSession::detached();
        assert_eq!(session.conversation_id(), None);
        assert!(session.latest().is_none());
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut session = ConversationSession::detached();
        assert!(session.append(exchange("a")));
        assert!(session.append(exchange("b")));
        assert!(session.append(exchange("c")));

        let ids: Vec<_> = session.exchanges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(session.latest().map(|e| e.id.as_str()), Some("c"));
        assert_eq!(session.position("b"), Some(1));
    }

    #[test]
    fn test_append_ignores_duplicate_id() {
        let mut session = ConversationSession::detached();
        session.append(exchange("a"));
        let mut duplicate = exchange("a");
        duplicate.prompt = "replacement".to_string();

        assert!(!session.append(duplicate));
        assert_eq!(session.len(), 1);
        assert_eq!(session.find("a").map(|e| e.prompt.as_str()), Some("prompt a"));
    }

    #[test]
    fn test_find_missing_returns_none() {
        let mut session = ConversationSession::detached();
        session.append(exchange("a"));
        assert!(session.find("zzz").is_none());
        assert!(session.position("zzz").is_none());
    }
}
