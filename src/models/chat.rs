use rusqlite::types::{ ToSql, ToSqlOutput, Value as SqlValue };
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };

use crate::error::HandlerError;

pub const MISSING_FIELDS_MESSAGE: &str =
    "JSON input must contain 'model_choice', 'query', and 'conversation_id' fields.";

/// Opaque conversation key exactly as the caller sent it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub Value);

impl ToSql for ConversationId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match &self.0 {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::Integer(i),
                (None, Some(f)) if !n.is_u64() => SqlValue::Real(f),
                _ => {
                    return Err(
                        rusqlite::Error::ToSqlConversionFailure(
                            format!("conversation_id {} is out of range for SQLite", n).into()
                        )
                    );
                }
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => {
                return Err(
                    rusqlite::Error::ToSqlConversionFailure(
                        format!("unsupported conversation_id type: {}", other).into()
                    )
                );
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// A validated request. `model_choice` is kept raw so an unknown value can be
/// reported separately from a missing one.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub model_choice: Value,
    pub query: String,
    pub conversation_id: ConversationId,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl ChatRequest {
    pub fn from_json(data: &Value) -> Result<Self, HandlerError> {
        let object = data
            .as_object()
            .ok_or_else(|| HandlerError::unexpected("request body must be a JSON object"))?;

        let model_choice = object.get("model_choice").filter(|v| is_truthy(v));
        let query = object.get("query").filter(|v| is_truthy(v));
        let conversation_id = object.get("conversation_id").filter(|v| !v.is_null());

        match (model_choice, query, conversation_id) {
            (Some(model_choice), Some(query), Some(conversation_id)) =>
                Ok(Self {
                    model_choice: model_choice.clone(),
                    query: match query {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                    conversation_id: ConversationId(conversation_id.clone()),
                }),
            _ => Err(HandlerError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
        }
    }
}

/// One stored exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub human: String,
    pub ai: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub turns: Vec<HistoryTurn>,
}

impl Conversation {
    pub fn push(&mut self, human: impl Into<String>, ai: impl Into<String>) {
        self.turns.push(HistoryTurn { human: human.into(), ai: ai.into() });
    }
}

/// A raw `messages` row as listed by the history commands.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Value>,
    pub user_content: Option<String>,
    pub ai_content: Option<String>,
    pub timestamp: Value,
}

/// The single JSON document written to stdout.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerOutput {
    Response(String),
    Error(String),
}

impl HandlerOutput {
    pub fn to_json(&self) -> String {
        let value = match self {
            HandlerOutput::Response(text) => json!({ "response": text }),
            HandlerOutput::Error(message) => json!({ "error": message }),
        };
        value.to_string()
    }
}

impl From<Result<String, HandlerError>> for HandlerOutput {
    fn from(result: Result<String, HandlerError>) -> Self {
        match result {
            Ok(response) => HandlerOutput::Response(response),
            Err(e) => HandlerOutput::Error(e.to_string()),
        }
    }
}
