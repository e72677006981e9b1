//! Events forwarded to the client over the live channel.
//!
//! Each event is one JSON object framed as an SSE `data:` line. Consumers
//! must ignore event types they do not recognise.

use serde::{Deserialize, Serialize};

use crate::turn::UsageReport;

/// One live channel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// The turn is bound to a conversation.
    Connected {
        /// Conversation identifier, new or existing.
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    /// Visible text increment.
    TextDelta {
        /// The increment.
        text: String,
    },
    /// Reasoning increment.
    ThinkingDelta {
        /// The increment.
        text: String,
    },
    /// The model asked for a tool.
    ToolUse {
        /// Tool name.
        #[serde(rename = "toolName")]
        tool_name: String,
        /// Tool input.
        input: serde_json::Value,
    },
    /// Usage for the finished turn.
    Usage {
        /// Aggregated figures.
        usage: UsageReport,
    },
    /// The turn failed. Sent at most once.
    Error {
        /// Human-readable description.
        error: String,
    },
    /// The turn is over.
    Done {
        /// Set when the iteration cap cut the turn short.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        truncated: bool,
    },
    /// An event type this version does not know.
    #[serde(other)]
    Unknown,
}

impl ChannelEvent {
    /// Serialize as an SSE frame: `data: {json}\n\n`.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing these variants cannot fail: every field is a string,
        // bool, number or JSON value.
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("data: {json}\n\n")
    }

    /// Parse one SSE line. Returns `None` for non-data lines and malformed
    /// payloads.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let data = line.strip_prefix("data:")?.trim();
        serde_json::from_str(data).ok()
    }
}
