use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use turnwise_types::{
    CollaboratorError, DocumentFormat, DocumentRef, DocumentRequest, DocumentService,
};

/// Document service that keeps every request in memory and hands out
/// `memory://` URLs.
pub struct InMemoryDocuments {
    documents: RwLock<HashMap<String, DocumentRequest>>,
}

impl InMemoryDocuments {
    /// Create an empty service.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a stored document request by id.
    pub async fn get(&self, id: &str) -> Option<DocumentRequest> {
        self.documents.read().await.get(id).cloned()
    }
}

impl Default for InMemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

fn extension(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Docx => "docx",
        DocumentFormat::Xlsx => "xlsx",
        DocumentFormat::Pdf => "pdf",
        DocumentFormat::Markdown => "md",
    }
}

#[async_trait]
impl DocumentService for InMemoryDocuments {
    async fn create_document(
        &self,
        request: DocumentRequest,
    ) -> Result<DocumentRef, CollaboratorError> {
        let id = uuid::Uuid::new_v4().to_string();
        let document = DocumentRef {
            url: format!("memory://documents/{id}.{}", extension(request.format)),
            id: id.clone(),
            format: request.format,
        };
        self.documents.write().await.insert(id, request);
        Ok(document)
    }
}
