use async_trait::async_trait;
use tokio::sync::RwLock;
use turnwise_types::{CollaboratorError, CompanyRecord, CrmClient};

/// In-memory CRM. Search is a case-insensitive substring match on the
/// company name and string-valued properties.
pub struct InMemoryCrm {
    companies: RwLock<Vec<CompanyRecord>>,
}

impl InMemoryCrm {
    /// Create a CRM holding `companies`.
    pub fn new(companies: Vec<CompanyRecord>) -> Self {
        Self {
            companies: RwLock::new(companies),
        }
    }

    /// Add or replace a company by id.
    pub async fn upsert(&self, company: CompanyRecord) {
        let mut companies = self.companies.write().await;
        match companies.iter_mut().find(|c| c.id == company.id) {
            Some(existing) => *existing = company,
            None => companies.push(company),
        }
    }
}

impl Default for InMemoryCrm {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn matches(company: &CompanyRecord, needle: &str) -> bool {
    company.name.to_lowercase().contains(needle)
        || company
            .properties
            .values()
            .filter_map(serde_json::Value::as_str)
            .any(|v| v.to_lowercase().contains(needle))
}

#[async_trait]
impl CrmClient for InMemoryCrm {
    async fn search_companies(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CompanyRecord>, CollaboratorError> {
        let needle = query.to_lowercase();
        Ok(self
            .companies
            .read()
            .await
            .iter()
            .filter(|c| matches(c, &needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_company(&self, id: &str) -> Result<CompanyRecord, CollaboratorError> {
        self.companies
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("company {id}")))
    }
}
