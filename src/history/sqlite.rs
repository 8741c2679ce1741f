use async_trait::async_trait;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{ params, Connection, OpenFlags, Row };
use serde_json::Value as JsonValue;
use std::path::{ Path, PathBuf };

use crate::error::HandlerError;
use crate::history::HistoryStore;
use crate::models::chat::{ Conversation, ConversationId, HistoryTurn, StoredMessage };

const SELECT_CONVERSATION: &str =
    "SELECT conversation_id, user_content, ai_content FROM messages \
     WHERE conversation_id = ?1 ORDER BY timestamp";

const SELECT_RECENT: &str =
    "SELECT id, conversation_id, timestamp, user_content, ai_content FROM messages \
     ORDER BY timestamp DESC LIMIT ?1";

const SELECT_MESSAGES: &str =
    "SELECT user_content, ai_content, timestamp FROM messages \
     WHERE conversation_id = ?1 ORDER BY timestamp";

fn sql_to_json(value: SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Integer(i) => JsonValue::from(i),
        SqlValue::Real(f) => JsonValue::from(f),
        SqlValue::Text(s) => JsonValue::String(s),
        SqlValue::Blob(b) => JsonValue::String(hex::encode(b)),
    }
}

/// Reads turns from the `messages` table. Each call opens its own read-only
/// connection and drops it before returning.
pub struct SqliteHistoryStore {
    db_path: PathBuf,
}

impl SqliteHistoryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self { db_path: db_path.as_ref().to_path_buf() }
    }

    fn open_conn(&self) -> Result<Connection, rusqlite::Error> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        )
    }

    fn query_turns(&self, conversation_id: &ConversationId) -> Result<Vec<HistoryTurn>, rusqlite::Error> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare(SELECT_CONVERSATION)?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok(HistoryTurn {
                human: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ai: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;
        let turns = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(turns)
    }

    fn query_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, rusqlite::Error> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare(SELECT_RECENT)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row: &Row<'_>| {
            Ok(StoredMessage {
                id: row.get(0)?,
                conversation_id: Some(sql_to_json(row.get(1)?)),
                timestamp: sql_to_json(row.get(2)?),
                user_content: row.get(3)?,
                ai_content: row.get(4)?,
            })
        })?;
        let messages = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn query_messages(
        &self,
        conversation_id: &ConversationId
    ) -> Result<Vec<StoredMessage>, rusqlite::Error> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare(SELECT_MESSAGES)?;
        let rows = stmt.query_map(params![conversation_id], |row: &Row<'_>| {
            Ok(StoredMessage {
                id: None,
                conversation_id: None,
                user_content: row.get(0)?,
                ai_content: row.get(1)?,
                timestamp: sql_to_json(row.get(2)?),
            })
        })?;
        let messages = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId
    ) -> Result<Conversation, HandlerError> {
        let store = SqliteHistoryStore::new(&self.db_path);
        let id = conversation_id.clone();
        let turns = tokio::task::spawn_blocking(move || store.query_turns(&id)).await??;
        debug!("Fetched {} stored turns for conversation {}", turns.len(), conversation_id.0);

        Ok(Conversation {
            id: conversation_id.clone(),
            turns,
        })
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, HandlerError> {
        let store = SqliteHistoryStore::new(&self.db_path);
        Ok(tokio::task::spawn_blocking(move || store.query_recent(limit)).await??)
    }

    async fn get_messages(
        &self,
        conversation_id: &ConversationId
    ) -> Result<Vec<StoredMessage>, HandlerError> {
        let store = SqliteHistoryStore::new(&self.db_path);
        let id = conversation_id.clone();
        Ok(tokio::task::spawn_blocking(move || store.query_messages(&id)).await??)
    }
}
