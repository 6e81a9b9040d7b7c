//! One question/answer pair recorded in a conversation

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single result record, column name to scalar value, in server order
pub type Row = serde_json::Map<String, Value>;

/// A prompt and the service's answer to it
///
/// Also accepts the shape returned by the history endpoint, where the
/// generated query may arrive as `sql`, the rows as `result`/`results`, and
/// the completion time as `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExchange {
    #[serde(default = "new_exchange_id")]
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, alias = "sql", deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(
        default,
        alias = "result",
        alias = "results",
        deserialize_with = "null_as_default"
    )]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default = "Utc::now",
        alias = "timestamp",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub failed: bool,
}

impl QueryExchange {
    /// Build a successful exchange stamped with the current time
    pub fn succeeded(
        id: Option<String>,
        prompt: impl Into<String>,
        query: impl Into<String>,
        rows: Vec<Row>,
        message: Option<String>,
    ) -> Self {
        Self {
            id: id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_exchange_id),
            prompt: prompt.into(),
            query: query.into(),
            rows,
            message,
            created_at: Utc::now(),
            failed: false,
        }
    }

    /// Build a failed exchange; failures never carry rows
    pub fn failure(prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: new_exchange_id(),
            prompt: prompt.into(),
            query: String::new(),
            rows: Vec::new(),
            message: Some(message.into()),
            created_at: Utc::now(),
            failed: true,
        }
    }

    /// Column names, taken from the keys of the first row
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Short single-line label for history lists
    pub fn summary(&self, max_chars: usize) -> String {
        let flat = self.prompt.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let mut truncated: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
            truncated.push('…');
            truncated
        }
    }
}

/// Render a cell value for display; nulls render as empty text
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn new_exchange_id() -> String {
    Uuid::new_v4().to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp).unwrap_or_else(Utc::now))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // naive ISO timestamps are assumed to be UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
