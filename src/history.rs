//! Append-only audit log of send outcomes.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use crate::contacts::Contact;
use crate::errors::StoreError;
use crate::store::{PersistenceStore, HISTORY_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Error,
}

/// Immutable record of one contact's terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub phone: String,
    pub name: String,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// ISO-8601 (RFC 3339) UTC timestamp
    pub timestamp: String,
    /// Attempts made before this outcome
    #[serde(default)]
    pub attempts: u32,
}

impl HistoryEntry {
    pub fn success(contact: &Contact, attempts: u32) -> Self {
        Self {
            phone: contact.phone.clone(),
            name: contact.name.clone(),
            status: HistoryStatus::Success,
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            attempts,
        }
    }

    pub fn failure(contact: &Contact, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            phone: contact.phone.clone(),
            name: contact.name.clone(),
            status: HistoryStatus::Error,
            error: Some(error.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            attempts,
        }
    }
}

/// History backed by a `PersistenceStore` key.
#[derive(Clone)]
pub struct HistoryLog {
    store: Arc<dyn PersistenceStore>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self { store }
    }

    /// Append one entry at the end of the log.
    pub async fn append(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let mut entries = self.all().await?;
        entries.push(entry);
        let json = serde_json::to_string(&entries)?;
        self.store.set(HISTORY_KEY, &json).await
    }

    /// All entries in insertion order.
    pub async fn all(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        match self.store.get(HISTORY_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Drop the whole log. Only called on an explicit user request.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::ContactStatus;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn contact(name: &str) -> Contact {
        Contact {
            phone: "+15551234567".to_string(),
            name: name.to_string(),
            message: "Hi".to_string(),
            extra_fields: HashMap::new(),
            row_number: 2,
            status: ContactStatus::Pending,
            phone_valid: true,
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let log = HistoryLog::new(Arc::new(MemoryStore::new()));
        log.append(HistoryEntry::success(&contact("Ann"), 1)).await.unwrap();
        log.append(HistoryEntry::failure(&contact("Bob"), "not found", 4))
            .await
            .unwrap();

        let entries = log.all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Ann");
        assert_eq!(entries[1].status, HistoryStatus::Error);
        assert_eq!(entries[1].error.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn test_clear() {
        let log = HistoryLog::new(Arc::new(MemoryStore::new()));
        log.append(HistoryEntry::success(&contact("Ann"), 1)).await.unwrap();
        log.clear().await.unwrap();
        assert!(log.all().await.unwrap().is_empty());
    }

    #[test]
    fn test_success_entry_omits_error_field() {
        let json = serde_json::to_value(HistoryEntry::success(&contact("Ann"), 1)).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("error").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }
}
