//! Capability back-ends consumed by the built-in tools.
//!
//! Wire formats of the real services are out of scope; these traits carry
//! only what the tools need.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors from capability back-ends.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The back-end rejected the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The back-end could not be reached or failed.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// A company in the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// CRM identifier.
    pub id: String,
    /// Company name.
    pub name: String,
    /// Free-form properties (stage, application status, owner, ...).
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// CRM lookups.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Search companies by free text, returning at most `limit` records.
    async fn search_companies(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CompanyRecord>, CollaboratorError>;

    /// Fetch one company by id.
    async fn get_company(&self, id: &str) -> Result<CompanyRecord, CollaboratorError>;
}

/// Output format of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Word document.
    Docx,
    /// Spreadsheet.
    Xlsx,
    /// PDF.
    Pdf,
    /// Markdown text.
    Markdown,
}

/// One section of a generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSection {
    /// Section heading.
    pub heading: String,
    /// Section body.
    pub body: String,
}

/// A document to be generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
    /// Title.
    pub title: String,
    /// Output format.
    pub format: DocumentFormat,
    /// Ordered sections.
    pub sections: Vec<DocumentSection>,
    /// User the document belongs to.
    pub owner: String,
}

/// Handle to a generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document identifier.
    pub id: String,
    /// Download location.
    pub url: String,
    /// Output format.
    pub format: DocumentFormat,
}

/// Document and spreadsheet generation.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Render and store a document.
    async fn create_document(
        &self,
        request: DocumentRequest,
    ) -> Result<DocumentRef, CollaboratorError>;
}

/// Key/value memory, partitioned by scope (one scope per user).
#[async_trait]
pub trait KeyValueMemory: Send + Sync {
    /// Store a value, replacing any previous one.
    async fn put(
        &self,
        scope: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), CollaboratorError>;

    /// Read a value.
    async fn get(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, CollaboratorError>;

    /// List keys in a scope, sorted.
    async fn keys(&self, scope: &str) -> Result<Vec<String>, CollaboratorError>;
}
