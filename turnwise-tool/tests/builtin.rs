use std::sync::Arc;

use serde_json::json;
use turnwise_state_memory::{InMemoryCrm, InMemoryDocuments, MemoryKeyValue};
use turnwise_tool::{ToolContext, ToolRegistry, standard_registry};
use turnwise_types::{CompanyRecord, ToolSchema};

struct Fixture {
    registry: ToolRegistry,
    documents: Arc<InMemoryDocuments>,
}

fn fixture() -> Fixture {
    let mut properties = serde_json::Map::new();
    properties.insert("application_status".into(), json!("approved"));
    let crm = Arc::new(InMemoryCrm::new(vec![
        CompanyRecord {
            id: "c-1".into(),
            name: "Acme Manufacturing".into(),
            properties,
        },
        CompanyRecord {
            id: "c-2".into(),
            name: "Acme Logistics".into(),
            properties: serde_json::Map::new(),
        },
    ]));
    let documents = Arc::new(InMemoryDocuments::new());
    let memory = Arc::new(MemoryKeyValue::new());
    Fixture {
        registry: standard_registry(crm, documents.clone(), memory),
        documents,
    }
}

fn ctx(user: &str) -> ToolContext {
    ToolContext {
        conversation_id: "conv".into(),
        user_id: user.into(),
        agent_type: "grant-cards".into(),
        allowed_tools: None,
    }
}

#[test]
fn standard_registry_offers_every_tool() {
    let registry = fixture().registry;
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(
        names,
        vec![
            "create_document",
            "crm_get_company",
            "crm_search",
            "recall",
            "remember",
            "web_search"
        ]
    );
    let schemas = registry.schemas(None);
    let create = schemas
        .iter()
        .find(|s| s.name() == "create_document")
        .unwrap();
    let ToolSchema::Local { input_schema, .. } = create else {
        panic!("create_document must be local");
    };
    let required = input_schema["required"].as_array().unwrap();
    assert!(required.contains(&json!("format")));
}

#[tokio::test]
async fn crm_search_respects_limit() {
    let registry = fixture().registry;
    let result = registry
        .dispatch("crm_search", json!({"query": "acme", "limit": 1}), &ctx("u"))
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["count"], 1);
    assert_eq!(result["companies"][0]["id"], "c-1");
}

#[tokio::test]
async fn crm_search_rejects_blank_query() {
    let registry = fixture().registry;
    let result = registry
        .dispatch("crm_search", json!({"query": "   "}), &ctx("u"))
        .await;
    assert_eq!(result["success"], false);
}

#[tokio::test]
async fn crm_get_company_missing_is_failure() {
    let registry = fixture().registry;
    let found = registry
        .dispatch("crm_get_company", json!({"company_id": "c-1"}), &ctx("u"))
        .await;
    assert_eq!(found["company"]["properties"]["application_status"], "approved");

    let missing = registry
        .dispatch("crm_get_company", json!({"company_id": "c-404"}), &ctx("u"))
        .await;
    assert_eq!(missing["success"], false);
    assert!(missing["error"].as_str().unwrap().contains("c-404"));
}

#[tokio::test]
async fn create_document_is_owned_by_caller() {
    let Fixture {
        registry,
        documents,
    } = fixture();
    let result = registry
        .dispatch(
            "create_document",
            json!({
                "title": "CanExport claim summary",
                "format": "xlsx",
                "sections": [{"heading": "Expenses", "body": "Trade show booth"}],
            }),
            &ctx("owner-7"),
        )
        .await;
    assert_eq!(result["success"], true);
    let id = result["document"]["id"].as_str().unwrap();
    let stored = documents.get(id).await.unwrap();
    assert_eq!(stored.owner, "owner-7");
    assert_eq!(stored.sections.len(), 1);
}

#[tokio::test]
async fn create_document_requires_sections() {
    let registry = fixture().registry;
    let result = registry
        .dispatch(
            "create_document",
            json!({"title": "Empty", "format": "pdf", "sections": []}),
            &ctx("u"),
        )
        .await;
    assert_eq!(result["success"], false);
}

#[tokio::test]
async fn memory_is_scoped_per_user() {
    let registry = fixture().registry;
    let stored = registry
        .dispatch(
            "remember",
            json!({"key": "company", "value": "Acme"}),
            &ctx("alice"),
        )
        .await;
    assert_eq!(stored["success"], true);

    let alice = registry
        .dispatch("recall", json!({"key": "company"}), &ctx("alice"))
        .await;
    assert_eq!(alice["found"], true);
    assert_eq!(alice["value"], "Acme");

    let bob = registry
        .dispatch("recall", json!({"key": "company"}), &ctx("bob"))
        .await;
    assert_eq!(bob["found"], false);

    let listing = registry.dispatch("recall", json!({}), &ctx("alice")).await;
    assert_eq!(listing["keys"], json!(["company"]));
}
