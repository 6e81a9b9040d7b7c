//! Test utilities for nlquery
//!
//! [`ScriptedService`] is an in-memory [`QueryService`] that replays queued
//! answers and records what it was asked.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::client::{ChatRequest, ChatResponse, QueryService, TranscriptMessage};
use crate::error::{NlQueryError, Result};
use crate::exchange::QueryExchange;

enum Scripted<T> {
    Ok(T),
    Err(String),
}

/// Replays queued chat answers; an exhausted queue answers with a query error
pub struct ScriptedService {
    conversation: Mutex<Scripted<String>>,
    history: Mutex<Scripted<Vec<QueryExchange>>>,
    chats: Mutex<VecDeque<Scripted<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            conversation: Mutex::new(Scripted::Ok("conv-test".to_string())),
            history: Mutex::new(Scripted::Ok(Vec::new())),
            chats: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_conversation_id(self, id: &str) -> Self {
        *self.conversation.lock().unwrap() = Scripted::Ok(id.to_string());
        self
    }

    pub fn with_conversation_error(self, message: &str) -> Self {
        *self.conversation.lock().unwrap() = Scripted::Err(message.to_string());
        self
    }

    pub fn with_history(self, exchanges: Vec<QueryExchange>) -> Self {
        *self.history.lock().unwrap() = Scripted::Ok(exchanges);
        self
    }

    pub fn with_history_error(self, message: &str) -> Self {
        *self.history.lock().unwrap() = Scripted::Err(message.to_string());
        self
    }

    pub fn with_chat(self, response: ChatResponse) -> Self {
        self.chats.lock().unwrap().push_back(Scripted::Ok(response));
        self
    }

    pub fn with_chat_json(self, value: serde_json::Value) -> Self {
        let response: ChatResponse =
            serde_json::from_value(value).expect("scripted chat response should parse");
        self.with_chat(response)
    }

    pub fn with_chat_error(self, message: &str) -> Self {
        self.chats
            .lock()
            .unwrap()
            .push_back(Scripted::Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn create_conversation(&self) -> Result<String> {
        match &*self.conversation.lock().unwrap() {
            Scripted::Ok(id) => Ok(id.clone()),
            Scripted::Err(message) => Err(NlQueryError::SessionCreation(message.clone())),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.chats.lock().unwrap().pop_front() {
            Some(Scripted::Ok(response)) => Ok(response),
            Some(Scripted::Err(message)) => Err(NlQueryError::Query(message)),
            None => Err(NlQueryError::Query("no scripted response".to_string())),
        }
    }

    async fn history(&self) -> Result<Vec<QueryExchange>> {
        match &*self.history.lock().unwrap() {
            Scripted::Ok(exchanges) => Ok(exchanges.clone()),
            Scripted::Err(message) => Err(NlQueryError::Query(message.clone())),
        }
    }

    async fn transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        Ok(vec![TranscriptMessage {
            role: "user".to_string(),
            content: format!("transcript for {}", conversation_id),
        }])
    }
}

/// Build `count` rows of the form `{"n": i}`
pub fn numbered_rows(count: usize) -> Vec<crate::exchange::Row> {
    (0..count)
        .map(|n| {
            let mut row = crate::exchange::Row::new();
            row.insert("n".to_string(), serde_json::json!(n));
            row
        })
        .collect()
}
