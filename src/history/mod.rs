mod sqlite;

pub use sqlite::SqliteHistoryStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::cli::Args;
use crate::error::HandlerError;
use crate::models::chat::{ ConversationId, HistoryTurn, Conversation, StoredMessage };

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All stored turns for `conversation_id`, oldest first.
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId
    ) -> Result<Conversation, HandlerError>;

    /// The newest `limit` messages across all conversations, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, HandlerError>;

    /// Every message of one conversation, oldest first.
    async fn get_messages(
        &self,
        conversation_id: &ConversationId
    ) -> Result<Vec<StoredMessage>, HandlerError>;
}

pub fn initialize_history_store(args: &Args) -> Arc<dyn HistoryStore> {
    info!("Chat history will be read from: {}", args.db_path);
    Arc::new(SqliteHistoryStore::new(&args.db_path))
}

/// Renders the newest `limit` turns as `Human:`/`AI:` lines in chronological order.
pub fn format_history_for_prompt(turns: &[HistoryTurn], limit: usize) -> String {
    let start = turns.len().saturating_sub(limit);
    turns[start..]
        .iter()
        .map(|turn| format!("Human: {}\nAI: {}", turn.human, turn.ai))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<HistoryTurn> {
        (1..=n)
            .map(|i| HistoryTurn { human: format!("q{}", i), ai: format!("a{}", i) })
            .collect()
    }

    #[test]
    fn empty_history_renders_nothing() {
        assert_eq!(format_history_for_prompt(&[], 5), "");
    }

    #[test]
    fn keeps_only_the_newest_turns_in_order() {
        let context = format_history_for_prompt(&turns(7), 5);
        assert_eq!(
            context,
            "Human: q3\nAI: a3\nHuman: q4\nAI: a4\nHuman: q5\nAI: a5\nHuman: q6\nAI: a6\nHuman: q7\nAI: a7"
        );
    }

    #[test]
    fn short_history_is_rendered_whole() {
        assert_eq!(format_history_for_prompt(&turns(2), 5), "Human: q1\nAI: a1\nHuman: q2\nAI: a2");
    }
}
