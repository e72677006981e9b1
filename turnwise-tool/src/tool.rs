//! The typed [`Tool`] trait and its type-erased form.

use std::future::Future;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use turnwise_types::{ToolError, ToolSchema};

/// Who a tool call is made on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolContext {
    /// Conversation the turn belongs to.
    pub conversation_id: String,
    /// User the turn runs for. Scopes per-user memory.
    pub user_id: String,
    /// Agent handling the turn.
    pub agent_type: String,
    /// Tools the agent may call. `None` allows every registered tool.
    pub allowed_tools: Option<Vec<String>>,
}

impl ToolContext {
    /// Whether `name` may be dispatched in this context.
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        match &self.allowed_tools {
            Some(list) => list.iter().any(|t| t == name),
            None => true,
        }
    }
}

/// A strongly typed, locally executed tool.
///
/// Input is deserialized into [`Tool::Args`] and the JSON schema offered to
/// the model is derived from the same type.
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    const NAME: &'static str;
    /// The deserialized input type.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// The serializable output type.
    type Output: Serialize;
    /// The tool-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// What the tool does, for the model.
    fn description(&self) -> &str;

    /// Execute the tool with typed arguments.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Type-erased tool. Blanket-implemented for every [`Tool`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// The schema offered to the model.
    fn schema(&self) -> ToolSchema;
    /// Execute with raw JSON input.
    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::Local {
            name: T::NAME.to_string(),
            description: self.description().to_string(),
            input_schema: input_schema_for::<T::Args>(),
        }
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

            let output = self
                .call(args, ctx)
                .await
                .map_err(|e| ToolError::ExecutionFailed(Box::new(e)))?;

            serde_json::to_value(&output).map_err(|e| ToolError::ExecutionFailed(Box::new(e)))
        })
    }
}

/// JSON schema for an argument type, without the draft and title headers.
#[must_use]
pub fn input_schema_for<A: schemars::JsonSchema>() -> serde_json::Value {
    let root = schemars::schema_for!(A);
    let mut value = serde_json::to_value(root)
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}
