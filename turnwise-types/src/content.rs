//! Conversation content: roles, messages, and content blocks.

use serde::{Deserialize, Serialize};

use crate::turn::ToolInvocation;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human (and synthetic tool-result entries).
    User,
    /// The model.
    Assistant,
}

/// A single block of conversation content.
///
/// The first five variants are produced by the stream decoder. `ToolResult`
/// and `RemoteToolResult` only appear in history: the former is appended by
/// the orchestrator after local dispatch, the latter arrives whole from the
/// backend when it executes a capability itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Visible assistant text.
    Text {
        /// The text.
        text: String,
    },
    /// Extended reasoning.
    Reasoning {
        /// The reasoning text.
        text: String,
        /// Backend verification signature, required when resubmitting.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Reasoning the backend encrypted. Kept so it can be sent back as is.
    RedactedReasoning {
        /// Opaque payload.
        data: String,
    },
    /// A request to run a locally dispatched tool.
    ToolInvocation {
        /// Invocation identifier assigned by the backend.
        id: String,
        /// Tool name.
        name: String,
        /// Structured input.
        input: serde_json::Value,
    },
    /// A tool the backend runs itself.
    RemoteToolInvocation {
        /// Invocation identifier assigned by the backend.
        id: String,
        /// Tool name.
        name: String,
        /// Structured input.
        input: serde_json::Value,
    },
    /// Result of a locally dispatched tool.
    ToolResult {
        /// The `id` of the matching `ToolInvocation`.
        tool_use_id: String,
        /// Dispatcher output (`{success, ...}`).
        content: serde_json::Value,
        /// Whether the dispatch failed.
        is_error: bool,
    },
    /// Result of a backend-executed tool, kept verbatim.
    RemoteToolResult {
        /// The `id` of the matching `RemoteToolInvocation`.
        tool_use_id: String,
        /// Opaque backend payload.
        content: serde_json::Value,
    },
}

impl ContentBlock {
    /// Convenience constructor for a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Returns the invocation if this is a locally dispatched tool request.
    #[must_use]
    pub fn as_tool_invocation(&self) -> Option<ToolInvocation> {
        match self {
            ContentBlock::ToolInvocation { id, name, input } => Some(ToolInvocation {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        }
    }
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message with a single text block.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant message with the given blocks.
    #[must_use]
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Concatenated text blocks, ignoring reasoning and tool traffic.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}
