//! Conversation persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{ContentBlock, Message, Role};
use crate::error::StoreError;

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Agent the conversation belongs to.
    pub agent_type: String,
    /// Display title.
    pub title: String,
    /// History, oldest first.
    pub messages: Vec<Message>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last append.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a conversation that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    /// Owning user.
    pub user_id: String,
    /// Agent the conversation belongs to.
    pub agent_type: String,
    /// Display title.
    pub title: String,
}

/// Persistence backend for conversations.
///
/// Appends for one conversation are serialized by the caller.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation, or `None` if it does not exist.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError>;

    /// Append one message to an existing conversation.
    async fn append_message(
        &self,
        id: &str,
        role: Role,
        content: Vec<ContentBlock>,
    ) -> Result<(), StoreError>;

    /// Create an empty conversation and return it.
    async fn create_conversation(&self, new: NewConversation) -> Result<Conversation, StoreError>;
}
