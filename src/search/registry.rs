//! One long-lived `IndexManager` per index type

use crate::models::IndexedEntity;
use crate::search::config::IndexConfig;
use crate::search::document::IndexType;
use crate::search::error::{IndexResult, SearchError};
use crate::search::index::{IndexManager, IndexStats};
use crate::state::EntityStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every index of the process; construct once and share by `Arc`
pub struct IndexRegistry {
    managers: HashMap<IndexType, Arc<IndexManager>>,
    config: IndexConfig,
}

impl IndexRegistry {
    /// Open (or create) all six indexes under `config.data_dir`
    pub async fn open(config: &IndexConfig) -> IndexResult<Self> {
        let mut managers = HashMap::with_capacity(IndexType::ALL.len());
        for index_type in IndexType::ALL {
            let manager = IndexManager::open(index_type, config).await?;
            managers.insert(index_type, Arc::new(manager));
        }

        tracing::info!(
            data_dir = %config.data_dir.display(),
            indexes = managers.len(),
            "Index registry opened"
        );

        Ok(Self {
            managers,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn get(&self, index_type: IndexType) -> IndexResult<&Arc<IndexManager>> {
        self.managers
            .get(&index_type)
            .ok_or_else(|| SearchError::unavailable(index_type, "index not registered"))
    }

    /// Upsert into the index matching the entity's kind
    pub async fn add(&self, entity: &IndexedEntity) -> IndexResult<()> {
        self.get(entity.index_type())?.add(entity).await
    }

    pub async fn remove(&self, entity: &IndexedEntity) -> IndexResult<()> {
        self.get(entity.index_type())?.remove(entity).await
    }

    pub async fn commit(&self, index_type: IndexType) -> IndexResult<()> {
        self.get(index_type)?.commit().await
    }

    /// Commit every index with pending changes
    pub async fn commit_all(&self) -> IndexResult<()> {
        for index_type in IndexType::ALL {
            self.commit(index_type).await?;
        }
        Ok(())
    }

    pub async fn reindex(&self, index_type: IndexType, store: &dyn EntityStore) -> IndexResult<u64> {
        self.get(index_type)?.reindex(store).await
    }

    pub fn stats(&self) -> IndexResult<Vec<IndexStats>> {
        IndexType::ALL
            .iter()
            .map(|index_type| self.get(*index_type).map(|m| m.stats()))
            .collect()
    }
}
