//! Durable key/value persistence shared with UI readers.
//!
//! Two keys are used: the pending contact queue and the history log, both
//! JSON-serialized. Readers get eventually-consistent snapshots; there is no
//! transactional isolation between keys.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial store trait with SQLite and in-memory backends

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::contacts::Contact;
use crate::errors::StoreError;
use async_trait::async_trait;

/// Key holding the JSON `Vec<Contact>` of undispatched contacts.
pub const QUEUE_KEY: &str = "wolfies_blitz_contacts";

/// Key holding the JSON `Vec<HistoryEntry>` audit log.
pub const HISTORY_KEY: &str = "wolfies_blitz_history";

/// String-keyed durable storage.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Load the persisted queue (empty when absent).
pub async fn load_queue(store: &dyn PersistenceStore) -> Result<Vec<Contact>, StoreError> {
    match store.get(QUEUE_KEY).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Replace the persisted queue. An empty queue removes the key.
pub async fn save_queue(store: &dyn PersistenceStore, contacts: &[Contact]) -> Result<(), StoreError> {
    if contacts.is_empty() {
        return store.remove(QUEUE_KEY).await;
    }
    let json = serde_json::to_string(contacts)?;
    store.set(QUEUE_KEY, &json).await
}
