//! Per-round-trip results, tool invocation records, and usage figures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::content::ContentBlock;

/// Why the model stopped producing output for a round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the reply.
    EndTurn,
    /// The model wants local tools run before it continues.
    ToolUse,
    /// The per-round-trip output limit was hit.
    MaxTokens,
    /// The backend ended the message abnormally.
    Error,
}

impl StopReason {
    /// Map a wire stop reason to the engine's enum.
    ///
    /// `stop_sequence`, `pause_turn` and unrecognised values count as a
    /// normal end. `refusal` is reported as [`StopReason::Error`].
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "refusal" => StopReason::Error,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token counts for one round-trip or an aggregated turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Uncached input tokens.
    pub input_tokens: u64,
    /// Output tokens (including reasoning).
    pub output_tokens: u64,
    /// Input tokens served from the prompt cache.
    pub cache_read_tokens: u64,
    /// Input tokens written to the prompt cache.
    pub cache_write_tokens: u64,
}

impl UsageStats {
    /// Add another set of counts into this one.
    pub fn accumulate(&mut self, other: &UsageStats) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_write_tokens += other.cache_write_tokens;
    }
}

/// The decoded outcome of one streamed call.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// Closed content blocks in stream order.
    pub blocks: Vec<ContentBlock>,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Usage reported for this call.
    pub usage: UsageStats,
}

impl TurnResult {
    /// Locally dispatched tool invocations, in block order.
    #[must_use]
    pub fn tool_invocations(&self) -> Vec<ToolInvocation> {
        self.blocks
            .iter()
            .filter_map(ContentBlock::as_tool_invocation)
            .collect()
    }
}

/// A request from the model to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Invocation identifier assigned by the backend.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Structured input.
    pub input: serde_json::Value,
}

/// A dispatched invocation and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    /// What was asked for.
    pub invocation: ToolInvocation,
    /// Dispatcher output, always a JSON object carrying `success`.
    pub result: serde_json::Value,
    /// Mirrors `result.success`.
    pub succeeded: bool,
}

impl ToolInvocationRecord {
    /// The history block that feeds this result back to the model.
    #[must_use]
    pub fn to_content_block(&self) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: self.invocation.id.clone(),
            content: self.result.clone(),
            is_error: !self.succeeded,
        }
    }
}

/// Derived usage figures for a logical turn, as sent on the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Model the turn ran on.
    pub model_id: String,
    /// Summed token counts across every round-trip.
    pub totals: UsageStats,
    /// Estimated cost in USD.
    pub cost: Decimal,
    /// Share of input served from cache, as a percentage in `0..=100`.
    pub cache_efficiency: f64,
    /// Number of round-trips folded in.
    pub round_trips: u32,
}
