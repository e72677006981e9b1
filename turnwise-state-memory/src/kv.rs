use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use turnwise_types::{CollaboratorError, KeyValueMemory};

/// In-memory key/value memory. Each scope is an isolated sorted map.
pub struct MemoryKeyValue {
    scopes: RwLock<HashMap<String, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryKeyValue {
    /// Create a new empty memory.
    pub fn new() -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKeyValue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueMemory for MemoryKeyValue {
    async fn put(
        &self,
        scope: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        self.scopes
            .write()
            .await
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, CollaboratorError> {
        Ok(self
            .scopes
            .read()
            .await
            .get(scope)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn keys(&self, scope: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self
            .scopes
            .read()
            .await
            .get(scope)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
