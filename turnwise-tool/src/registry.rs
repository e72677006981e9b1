//! Tool registry and dispatcher.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use turnwise_types::{ToolError, ToolInvocation, ToolInvocationRecord, ToolSchema};

use crate::tool::{Tool, ToolContext, ToolDyn};

/// Where a registered name is executed.
#[derive(Clone)]
pub enum Route {
    /// Run by a local handler.
    Local(Arc<dyn ToolDyn>),
    /// Run by the backend. Only the descriptor is kept.
    Remote(serde_json::Value),
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Local(tool) => f.debug_tuple("Local").field(&tool.name()).finish(),
            Route::Remote(spec) => f.debug_tuple("Remote").field(spec).finish(),
        }
    }
}

/// Name → route table.
///
/// [`ToolRegistry::dispatch`] never returns an error: unknown names,
/// remote names, handler errors and handler panics all become
/// `{"success": false, "error": ...}`.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    routes: BTreeMap<String, Route>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strongly typed tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.routes
            .insert(T::NAME.to_string(), Route::Local(Arc::new(tool)));
        self
    }

    /// Register a pre-erased tool.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) -> &mut Self {
        self.routes
            .insert(tool.name().to_string(), Route::Local(tool));
        self
    }

    /// Register a backend-executed tool by its backend descriptor.
    pub fn register_remote(&mut self, name: impl Into<String>, spec: serde_json::Value) -> &mut Self {
        self.routes.insert(name.into(), Route::Remote(spec));
        self
    }

    /// Look up a route by name.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    /// Whether `name` is executed by the backend.
    #[must_use]
    pub fn is_remote(&self, name: &str) -> bool {
        matches!(self.routes.get(name), Some(Route::Remote(_)))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Schemas to offer the model, sorted by name. `allowed` restricts the
    /// set; names in it that are not registered are skipped.
    #[must_use]
    pub fn schemas(&self, allowed: Option<&[String]>) -> Vec<ToolSchema> {
        self.routes
            .iter()
            .filter(|(name, _)| allowed.is_none_or(|list| list.iter().any(|a| a == *name)))
            .map(|(name, route)| match route {
                Route::Local(tool) => tool.schema(),
                Route::Remote(spec) => ToolSchema::Remote {
                    name: name.clone(),
                    spec: spec.clone(),
                },
            })
            .collect()
    }

    /// Run one tool and return the dispatcher payload.
    pub async fn dispatch(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> serde_json::Value {
        match self.execute(name, input, ctx).await {
            Ok(output) => {
                tracing::debug!(tool = name, "turnwise.tool.ok");
                success_payload(output)
            }
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "turnwise.tool.failed");
                failure_payload(&err)
            }
        }
    }

    /// Run one invocation and keep it paired with its result.
    pub async fn dispatch_invocation(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext,
    ) -> ToolInvocationRecord {
        let result = self
            .dispatch(&invocation.name, invocation.input.clone(), ctx)
            .await;
        let succeeded = result
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        ToolInvocationRecord {
            invocation: invocation.clone(),
            result,
            succeeded,
        }
    }

    /// Run every invocation concurrently. Records come back in invocation
    /// order regardless of completion order.
    pub async fn dispatch_all(
        &self,
        invocations: &[ToolInvocation],
        ctx: &ToolContext,
    ) -> Vec<ToolInvocationRecord> {
        tracing::debug!(count = invocations.len(), "turnwise.tool.dispatch_all");
        join_all(
            invocations
                .iter()
                .map(|invocation| self.dispatch_invocation(invocation, ctx)),
        )
        .await
    }

    async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        tracing::debug!(
            tool = name,
            conversation_id = %ctx.conversation_id,
            "turnwise.tool.dispatch"
        );
        let tool = match self.routes.get(name) {
            None => return Err(ToolError::NotFound(name.to_string())),
            Some(Route::Remote(_)) => return Err(ToolError::RemoteOnly(name.to_string())),
            Some(Route::Local(tool)) => tool,
        };
        if !ctx.allows(name) {
            return Err(ToolError::NotAllowed(name.to_string()));
        }

        match AssertUnwindSafe(tool.call_dyn(input, ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(ToolError::Panicked(panic_message(panic.as_ref()))),
        }
    }
}

/// `{"success": true, ...}` for object outputs, otherwise
/// `{"success": true, "result": output}`.
fn success_payload(output: serde_json::Value) -> serde_json::Value {
    match output {
        serde_json::Value::Object(mut map) => {
            map.insert("success".into(), serde_json::Value::Bool(true));
            serde_json::Value::Object(map)
        }
        other => serde_json::json!({ "success": true, "result": other }),
    }
}

fn failure_payload(err: &ToolError) -> serde_json::Value {
    serde_json::json!({ "success": false, "error": err.to_string() })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_payload_merges_objects() {
        assert_eq!(
            success_payload(json!({"count": 2})),
            json!({"count": 2, "success": true})
        );
        assert_eq!(
            success_payload(json!(["a", "b"])),
            json!({"success": true, "result": ["a", "b"]})
        );
    }

    #[test]
    fn panic_message_handles_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }

    #[test]
    fn schemas_respect_allow_list() {
        let mut registry = ToolRegistry::new();
        registry.register_remote("web_search", json!({"type": "web_search_20250305"}));
        assert_eq!(registry.schemas(None).len(), 1);
        assert!(registry.schemas(Some(&["recall".to_string()])).is_empty());
        assert!(registry.is_remote("web_search"));
    }
}
