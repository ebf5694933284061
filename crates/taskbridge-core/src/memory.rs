//! In-memory store implementations.
//!
//! Backing for tests and for embedders that keep entities in process. The
//! engine itself only sees the [`EntityStore`] and [`InstallationStore`]
//! traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::installation::Installation;
use crate::record::LocalRecord;
use crate::store::{EntityStore, Filter, InstallationStore, StoreError, StoreResult};

/// In-memory entity collection.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, LocalRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<LocalRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find(&self, filter: &Filter) -> StoreResult<Vec<LocalRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn list_modified_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<LocalRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| since.is_none_or(|ts| r.updated_at > ts))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &LocalRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::duplicate(format!("record {}", record.id)));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &LocalRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if !records.contains_key(&record.id) {
            return Err(StoreError::not_found("record", record.id.to_string()));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }
}

/// In-memory installation store.
#[derive(Default)]
pub struct MemoryInstallationStore {
    installations: RwLock<HashMap<Uuid, Installation>>,
}

impl MemoryInstallationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an installation.
    pub async fn insert(&self, installation: Installation) {
        self.installations
            .write()
            .await
            .insert(installation.id, installation);
    }

    /// Remove an installation.
    pub async fn remove(&self, id: Uuid) -> Option<Installation> {
        self.installations.write().await.remove(&id)
    }
}

#[async_trait]
impl InstallationStore for MemoryInstallationStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Installation>> {
        Ok(self.installations.read().await.get(&id).cloned())
    }

    async fn update(&self, installation: &Installation) -> StoreResult<()> {
        let mut installations = self.installations.write().await;
        if !installations.contains_key(&installation.id) {
            return Err(StoreError::not_found(
                "installation",
                installation.id.to_string(),
            ));
        }
        installations.insert(installation.id, installation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use serde_json::Map;

    #[tokio::test]
    async fn test_insert_get_update() {
        let store = MemoryStore::new();
        let mut record = LocalRecord::new(Map::new());
        store.insert(&record).await.unwrap();
        assert_eq!(store.len().await, 1);

        // Duplicate insert rejected
        assert!(store.insert(&record).await.is_err());

        record.external_id = Some("EXT-9".to_string());
        store.update(&record).await.unwrap();
        let fetched = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.external_id.as_deref(), Some("EXT-9"));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let record = LocalRecord::new(Map::new());
        assert!(matches!(
            store.update(&record).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_external_id() {
        let store = MemoryStore::new();
        let record = LocalRecord::linked(Map::new(), "EXT-1".to_string(), Provider::Linear);
        store.insert(&record).await.unwrap();

        let found = store.find_by_external_id("EXT-1").await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(record.id));
        assert!(store.find_by_external_id("EXT-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_modified_since() {
        let store = MemoryStore::new();
        let record = LocalRecord::new(Map::new());
        store.insert(&record).await.unwrap();

        let all = store.list_modified_since(None).await.unwrap();
        assert_eq!(all.len(), 1);

        let past = record.updated_at - chrono::Duration::minutes(5);
        assert_eq!(store.list_modified_since(Some(past)).await.unwrap().len(), 1);

        let future = record.updated_at + chrono::Duration::minutes(5);
        assert!(store
            .list_modified_since(Some(future))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_installation_store() {
        let store = MemoryInstallationStore::new();
        let mut inst = Installation::new("x", Provider::Trello, "https://e", "k");
        store.insert(inst.clone()).await;

        let fetched = store.get(inst.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "x");

        inst.last_error = Some("boom".to_string());
        store.update(&inst).await.unwrap();
        let fetched = store.get(inst.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_error.as_deref(), Some("boom"));

        store.remove(inst.id).await;
        assert!(store.get(inst.id).await.unwrap().is_none());
    }
}
