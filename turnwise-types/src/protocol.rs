//! Incremental protocol events emitted by the model backend.
//!
//! These mirror the Anthropic Messages streaming format. Unknown event,
//! block, and delta types deserialize to `Unknown` variants so that new
//! backend features are skipped rather than treated as errors.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages-streaming>

use serde::{Deserialize, Serialize};

use crate::turn::UsageStats;

/// One decoded event from the backend stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Opens the message.
    MessageStart {
        /// Message metadata, including initial usage.
        message: MessageStart,
    },
    /// Opens a content block.
    ContentBlockStart {
        /// Block index within the message.
        index: usize,
        /// Block header.
        content_block: BlockStart,
    },
    /// Adds to the open content block.
    ContentBlockDelta {
        /// Block index within the message.
        index: usize,
        /// The increment.
        delta: BlockDelta,
    },
    /// Closes the open content block.
    ContentBlockStop {
        /// Block index within the message.
        index: usize,
    },
    /// Carries the stop reason and final usage.
    MessageDelta {
        /// Stop reason holder.
        delta: MessageDeltaBody,
        /// Cumulative usage, if reported.
        #[serde(default)]
        usage: Option<WireUsage>,
    },
    /// Ends the message.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// The backend aborted the stream.
    Error {
        /// Error details.
        error: WireError,
    },
    /// Any event type this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// Payload of `message_start`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageStart {
    /// Backend message identifier.
    #[serde(default)]
    pub id: String,
    /// Model that is answering.
    #[serde(default)]
    pub model: String,
    /// Initial usage (input side).
    #[serde(default)]
    pub usage: WireUsage,
}

/// Header of a newly opened content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    /// Visible text.
    Text {
        /// Initial text, normally empty.
        #[serde(default)]
        text: String,
    },
    /// Extended reasoning.
    Thinking {
        /// Initial reasoning, normally empty.
        #[serde(default)]
        thinking: String,
    },
    /// Reasoning the backend encrypted. Complete at start and opaque.
    RedactedThinking {
        /// Encrypted payload, resubmitted unchanged.
        data: String,
    },
    /// A tool to be dispatched locally. Input arrives as partial JSON.
    ToolUse {
        /// Invocation identifier.
        id: String,
        /// Tool name.
        name: String,
    },
    /// A tool the backend runs itself. Input is complete at start.
    ServerToolUse {
        /// Invocation identifier.
        id: String,
        /// Tool name.
        name: String,
        /// Full input.
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Result of a backend-run web search, complete at start.
    WebSearchToolResult {
        /// The matching `server_tool_use` id.
        tool_use_id: String,
        /// Opaque result payload.
        #[serde(default)]
        content: serde_json::Value,
    },
    /// Any block type this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// An increment to the open content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text increment.
    TextDelta {
        /// The increment.
        text: String,
    },
    /// Reasoning increment.
    ThinkingDelta {
        /// The increment.
        thinking: String,
    },
    /// Reasoning signature.
    SignatureDelta {
        /// The signature.
        signature: String,
    },
    /// Tool input fragment.
    InputJsonDelta {
        /// Raw partial JSON text.
        partial_json: String,
    },
    /// Any delta type this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// Body of `message_delta`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    /// Raw stop reason, mapped by [`crate::StopReason::from_wire`].
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Usage as reported on the wire. Fields are optional because
/// `message_delta` only repeats the counters that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireUsage {
    /// Uncached input tokens.
    #[serde(default)]
    pub input_tokens: Option<u64>,
    /// Output tokens.
    #[serde(default)]
    pub output_tokens: Option<u64>,
    /// Tokens read from the prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    /// Tokens written to the prompt cache.
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
}

impl WireUsage {
    /// Overwrite the fields of `stats` that this report carries.
    pub fn merge_into(&self, stats: &mut UsageStats) {
        if let Some(n) = self.input_tokens {
            stats.input_tokens = n;
        }
        if let Some(n) = self.output_tokens {
            stats.output_tokens = n;
        }
        if let Some(n) = self.cache_read_input_tokens {
            stats.cache_read_tokens = n;
        }
        if let Some(n) = self.cache_creation_input_tokens {
            stats.cache_write_tokens = n;
        }
    }
}

/// Error payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    /// Backend error category (e.g. `overloaded_error`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}
