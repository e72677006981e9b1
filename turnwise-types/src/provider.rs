//! Provider trait for model backends.
//!
//! [`Provider`] uses return-position `impl Trait` and is not object-safe.
//! The orchestrator is generic over it instead.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::content::Message;
use crate::error::ProviderError;
use crate::protocol::ProtocolEvent;

/// A stream of protocol events for one call.
pub type ProtocolStream = Pin<Box<dyn Stream<Item = Result<ProtocolEvent, ProviderError>> + Send>>;

/// Everything the backend needs for one streamed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// System prompt.
    pub system: Option<String>,
    /// Conversation history, oldest first.
    pub messages: Vec<Message>,
    /// Tools offered to the model.
    pub tools: Vec<ToolSchema>,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Extended reasoning budget. `None` disables reasoning.
    pub reasoning_budget_tokens: Option<u32>,
}

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolSchema {
    /// Dispatched locally with a JSON-schema input.
    Local {
        /// Tool name.
        name: String,
        /// What the tool does, for the model.
        description: String,
        /// JSON schema of the input object.
        input_schema: serde_json::Value,
    },
    /// Executed by the backend. `spec` is the backend's own descriptor and
    /// is passed through untouched.
    Remote {
        /// Tool name.
        name: String,
        /// Backend descriptor.
        spec: serde_json::Value,
    },
}

impl ToolSchema {
    /// The tool's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ToolSchema::Local { name, .. } | ToolSchema::Remote { name, .. } => name,
        }
    }
}

/// Model backend interface.
pub trait Provider: Send + Sync {
    /// Open a streamed call.
    ///
    /// Errors returned here happen before any event was produced and are
    /// safe to retry when [`ProviderError::is_retryable`] says so.
    fn stream(
        &self,
        request: ProviderRequest,
    ) -> impl Future<Output = Result<ProtocolStream, ProviderError>> + Send;
}
