use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use turnwise_tool::*;
use turnwise_types::{ToolInvocation, ToolSchema};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SleepArgs {
    millis: u64,
    label: String,
}

#[derive(Debug, Serialize)]
struct SleepOutput {
    label: String,
}

#[derive(Debug)]
enum Never {}

impl std::fmt::Display for Never {
    fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {}
    }
}

impl std::error::Error for Never {}

struct SleepTool;

impl Tool for SleepTool {
    const NAME: &'static str = "sleep";
    type Args = SleepArgs;
    type Output = SleepOutput;
    type Error = Never;

    fn description(&self) -> &str {
        "Sleep then echo the label"
    }

    async fn call(&self, args: SleepArgs, _ctx: &ToolContext) -> Result<SleepOutput, Never> {
        tokio::time::sleep(Duration::from_millis(args.millis)).await;
        Ok(SleepOutput { label: args.label })
    }
}

#[derive(Debug)]
struct Refused(String);

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "refused: {}", self.0)
    }
}

impl std::error::Error for Refused {}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct EmptyArgs {}

struct FailingTool;

impl Tool for FailingTool {
    const NAME: &'static str = "failing";
    type Args = EmptyArgs;
    type Output = ();
    type Error = Refused;

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn call(&self, _args: EmptyArgs, _ctx: &ToolContext) -> Result<(), Refused> {
        Err(Refused("backend down".into()))
    }
}

struct PanickingTool;

impl Tool for PanickingTool {
    const NAME: &'static str = "panicking";
    type Args = EmptyArgs;
    type Output = ();
    type Error = Refused;

    fn description(&self) -> &str {
        "Panics"
    }

    async fn call(&self, _args: EmptyArgs, _ctx: &ToolContext) -> Result<(), Refused> {
        panic!("handler exploded")
    }
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(SleepTool)
        .register(FailingTool)
        .register(PanickingTool)
        .register_remote(WEB_SEARCH, web_search_spec());
    registry
}

fn ctx() -> ToolContext {
    ToolContext {
        conversation_id: "conv-1".into(),
        user_id: "user-1".into(),
        agent_type: "general".into(),
        allowed_tools: None,
    }
}

fn error_of(result: &serde_json::Value) -> &str {
    assert_eq!(result["success"], false, "expected failure: {result}");
    let error = result["error"].as_str().unwrap();
    assert!(!error.is_empty());
    error
}

#[tokio::test]
async fn unknown_tool_is_structured_failure() {
    let result = registry().dispatch("does_not_exist", json!({}), &ctx()).await;
    assert!(error_of(&result).contains("does_not_exist"));
}

#[tokio::test]
async fn remote_tool_reaching_dispatcher_is_protocol_violation() {
    let result = registry().dispatch(WEB_SEARCH, json!({"query": "x"}), &ctx()).await;
    assert!(error_of(&result).contains("protocol violation"));
}

#[tokio::test]
async fn handler_error_is_captured() {
    let result = registry().dispatch("failing", json!({}), &ctx()).await;
    assert!(error_of(&result).contains("backend down"));
}

#[tokio::test]
async fn invalid_input_is_captured() {
    let result = registry().dispatch("sleep", json!({"millis": "soon"}), &ctx()).await;
    assert!(error_of(&result).starts_with("invalid input"));
}

#[tokio::test]
async fn handler_panic_is_captured() {
    let result = registry().dispatch("panicking", json!({}), &ctx()).await;
    assert!(error_of(&result).contains("handler exploded"));
}

#[tokio::test]
async fn disallowed_tool_is_refused() {
    let ctx = ToolContext {
        allowed_tools: Some(vec!["failing".into()]),
        ..ctx()
    };
    let result = registry()
        .dispatch("sleep", json!({"millis": 0, "label": "a"}), &ctx)
        .await;
    assert!(error_of(&result).contains("not available"));
}

#[tokio::test]
async fn success_merges_payload() {
    let result = registry()
        .dispatch("sleep", json!({"millis": 0, "label": "ok"}), &ctx())
        .await;
    assert_eq!(result, json!({"success": true, "label": "ok"}));
}

#[tokio::test]
async fn record_pairs_invocation_with_result() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepTool);
    let record = registry
        .dispatch_invocation(
            &ToolInvocation {
                id: "toolu_1".into(),
                name: "sleep".into(),
                input: json!({"millis": 0, "label": "x"}),
            },
            &ctx(),
        )
        .await;
    assert!(record.succeeded);
    assert_eq!(record.invocation.id, "toolu_1");
}

#[tokio::test]
async fn concurrent_results_keep_invocation_order() {
    let invocations: Vec<ToolInvocation> = [(200, "first"), (0, "second"), (100, "third")]
        .into_iter()
        .enumerate()
        .map(|(i, (millis, label))| ToolInvocation {
            id: format!("toolu_{i}"),
            name: "sleep".into(),
            input: json!({"millis": millis, "label": label}),
        })
        .collect();

    let started = std::time::Instant::now();
    let records = registry().dispatch_all(&invocations, &ctx()).await;
    let elapsed = started.elapsed();

    let labels: Vec<&str> = records
        .iter()
        .map(|r| r.result["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["first", "second", "third"]);
    assert!(records.iter().all(|r| r.succeeded));
    // run concurrently, not back to back
    assert!(elapsed < Duration::from_millis(280), "took {elapsed:?}");
}

#[tokio::test]
async fn mixed_batch_keeps_failures_in_place() {
    let invocations = vec![
        ToolInvocation {
            id: "a".into(),
            name: "failing".into(),
            input: json!({}),
        },
        ToolInvocation {
            id: "b".into(),
            name: "sleep".into(),
            input: json!({"millis": 0, "label": "fine"}),
        },
    ];
    let records = registry().dispatch_all(&invocations, &ctx()).await;
    assert!(!records[0].succeeded);
    assert!(records[1].succeeded);
    assert_eq!(records[1].invocation.id, "b");
}

#[test]
fn schemas_include_local_and_remote() {
    let schemas = registry().schemas(None);
    let names: Vec<&str> = schemas.iter().map(ToolSchema::name).collect();
    assert_eq!(names, vec!["failing", "panicking", "sleep", "web_search"]);
    match &schemas[2] {
        ToolSchema::Local { input_schema, .. } => {
            assert_eq!(input_schema["type"], "object");
        }
        other => panic!("expected local schema, got {other:?}"),
    }
    assert!(matches!(schemas[3], ToolSchema::Remote { .. }));
}
