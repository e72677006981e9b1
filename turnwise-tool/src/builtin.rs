//! Built-in tools backed by the CRM, document and memory collaborators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use turnwise_types::{
    CollaboratorError, CompanyRecord, CrmClient, DocumentFormat, DocumentRef, DocumentRequest,
    DocumentSection, DocumentService, KeyValueMemory,
};

use crate::registry::ToolRegistry;
use crate::tool::{Tool, ToolContext};

const DEFAULT_SEARCH_LIMIT: usize = 5;
const MAX_SEARCH_LIMIT: usize = 25;

/// Name of the backend-executed web search tool.
pub const WEB_SEARCH: &str = "web_search";

/// Backend descriptor for [`WEB_SEARCH`].
#[must_use]
pub fn web_search_spec() -> serde_json::Value {
    serde_json::json!({
        "type": "web_search_20250305",
        "name": WEB_SEARCH,
        "max_uses": 5,
    })
}

/// A registry with every built-in tool plus the remote web search.
#[must_use]
pub fn standard_registry(
    crm: Arc<dyn CrmClient>,
    documents: Arc<dyn DocumentService>,
    memory: Arc<dyn KeyValueMemory>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(CrmSearch { crm: crm.clone() })
        .register(CrmGetCompany { crm })
        .register(CreateDocument { documents })
        .register(Remember {
            memory: memory.clone(),
        })
        .register(Recall { memory })
        .register_remote(WEB_SEARCH, web_search_spec());
    registry
}

// ─── CRM ─────────────────────────────────────────────────────────────────────

/// Arguments for [`CrmSearch`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CrmSearchArgs {
    /// Company name or keyword.
    pub query: String,
    /// Maximum results (default 5, at most 25).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Result of [`CrmSearch`].
#[derive(Debug, Serialize)]
pub struct CrmSearchOutput {
    /// Matching companies.
    pub companies: Vec<CompanyRecord>,
    /// Number of matches returned.
    pub count: usize,
}

/// Free-text company search.
pub struct CrmSearch {
    /// CRM back-end.
    pub crm: Arc<dyn CrmClient>,
}

impl Tool for CrmSearch {
    const NAME: &'static str = "crm_search";
    type Args = CrmSearchArgs;
    type Output = CrmSearchOutput;
    type Error = CollaboratorError;

    fn description(&self) -> &str {
        "Search CRM companies by name or keyword. Use for application status and contact lookups."
    }

    async fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        let query = args.query.trim();
        if query.is_empty() {
            return Err(CollaboratorError::Rejected("query must not be empty".into()));
        }
        let limit = args
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        let companies = self.crm.search_companies(query, limit).await?;
        Ok(CrmSearchOutput {
            count: companies.len(),
            companies,
        })
    }
}

/// Arguments for [`CrmGetCompany`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CrmGetCompanyArgs {
    /// CRM company identifier, as returned by `crm_search`.
    pub company_id: String,
}

/// Result of [`CrmGetCompany`].
#[derive(Debug, Serialize)]
pub struct CrmGetCompanyOutput {
    /// The company.
    pub company: CompanyRecord,
}

/// Fetch one company with all properties.
pub struct CrmGetCompany {
    /// CRM back-end.
    pub crm: Arc<dyn CrmClient>,
}

impl Tool for CrmGetCompany {
    const NAME: &'static str = "crm_get_company";
    type Args = CrmGetCompanyArgs;
    type Output = CrmGetCompanyOutput;
    type Error = CollaboratorError;

    fn description(&self) -> &str {
        "Fetch a CRM company record by id, including all stored properties."
    }

    async fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        let company = self.crm.get_company(&args.company_id).await?;
        Ok(CrmGetCompanyOutput { company })
    }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Arguments for [`CreateDocument`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDocumentArgs {
    /// Document title.
    pub title: String,
    /// Output format.
    pub format: DocumentFormat,
    /// Ordered sections.
    pub sections: Vec<DocumentSection>,
}

/// Result of [`CreateDocument`].
#[derive(Debug, Serialize)]
pub struct CreateDocumentOutput {
    /// Handle to the stored document.
    pub document: DocumentRef,
}

/// Render a document or spreadsheet owned by the current user.
pub struct CreateDocument {
    /// Document back-end.
    pub documents: Arc<dyn DocumentService>,
}

impl Tool for CreateDocument {
    const NAME: &'static str = "create_document";
    type Args = CreateDocumentArgs;
    type Output = CreateDocumentOutput;
    type Error = CollaboratorError;

    fn description(&self) -> &str {
        "Create a downloadable document (docx, xlsx, pdf or markdown) from titled sections."
    }

    async fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        if args.title.trim().is_empty() {
            return Err(CollaboratorError::Rejected("title must not be empty".into()));
        }
        if args.sections.is_empty() {
            return Err(CollaboratorError::Rejected(
                "at least one section is required".into(),
            ));
        }
        let document = self
            .documents
            .create_document(DocumentRequest {
                title: args.title,
                format: args.format,
                sections: args.sections,
                owner: ctx.user_id.clone(),
            })
            .await?;
        Ok(CreateDocumentOutput { document })
    }
}

// ─── Memory ──────────────────────────────────────────────────────────────────

/// Arguments for [`Remember`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RememberArgs {
    /// Key to store under.
    pub key: String,
    /// Any JSON value.
    pub value: serde_json::Value,
}

/// Store a fact for the current user.
pub struct Remember {
    /// Memory back-end.
    pub memory: Arc<dyn KeyValueMemory>,
}

impl Tool for Remember {
    const NAME: &'static str = "remember";
    type Args = RememberArgs;
    type Output = serde_json::Value;
    type Error = CollaboratorError;

    fn description(&self) -> &str {
        "Remember a fact about the user for later conversations."
    }

    async fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        if args.key.trim().is_empty() {
            return Err(CollaboratorError::Rejected("key must not be empty".into()));
        }
        self.memory.put(&ctx.user_id, &args.key, args.value).await?;
        Ok(serde_json::json!({ "stored": args.key }))
    }
}

/// Arguments for [`Recall`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecallArgs {
    /// Key to read. Omit to list every stored key.
    #[serde(default)]
    pub key: Option<String>,
}

/// Read back facts stored with `remember`.
pub struct Recall {
    /// Memory back-end.
    pub memory: Arc<dyn KeyValueMemory>,
}

impl Tool for Recall {
    const NAME: &'static str = "recall";
    type Args = RecallArgs;
    type Output = serde_json::Value;
    type Error = CollaboratorError;

    fn description(&self) -> &str {
        "Recall a remembered fact by key, or list remembered keys."
    }

    async fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        match args.key {
            Some(key) => {
                let value = self.memory.get(&ctx.user_id, &key).await?;
                Ok(serde_json::json!({
                    "key": key,
                    "found": value.is_some(),
                    "value": value,
                }))
            }
            None => {
                let keys = self.memory.keys(&ctx.user_id).await?;
                Ok(serde_json::json!({ "keys": keys }))
            }
        }
    }
}
