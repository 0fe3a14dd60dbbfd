use crate::error::{AppError, Result};
use crate::models::IndexedEntity;
use crate::search::IndexType;
use crate::state::{EntityStore, Page, PageCursor};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// A JSON document listing entities to load into a store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub entities: Vec<IndexedEntity>,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

/// In-memory entity store (for the CLI and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    entities: Arc<DashMap<IndexType, BTreeMap<Uuid, IndexedEntity>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(DashMap::new()),
        }
    }

    pub fn from_corpus(corpus: Corpus) -> Self {
        let store = Self::new();
        for entity in corpus.entities {
            store.insert(entity);
        }
        store
    }

    /// Insert or replace an entity
    pub fn insert(&self, entity: impl Into<IndexedEntity>) {
        let entity = entity.into();
        let uuid = entity.uuid();
        self.entities
            .entry(entity.index_type())
            .or_default()
            .insert(uuid, entity);
        tracing::debug!(entity_uuid = %uuid, "Entity saved");
    }

    pub fn remove(&self, kind: IndexType, uuid: &Uuid) -> Option<IndexedEntity> {
        self.entities
            .get_mut(&kind)
            .and_then(|mut entities| entities.remove(uuid))
    }

    /// All entities of one kind, in UUID order
    pub fn all(&self, kind: IndexType) -> Vec<IndexedEntity> {
        self.entities
            .get(&kind)
            .map(|entities| entities.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn fetch_page(
        &self,
        kind: IndexType,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Page> {
        if limit == 0 {
            return Err(AppError::Validation("page limit must be positive".to_string()));
        }

        let Some(entities) = self.entities.get(&kind) else {
            return Ok(Page::default());
        };

        let lower = match cursor {
            Some(PageCursor(uuid)) => Bound::Excluded(*uuid),
            None => Bound::Unbounded,
        };
        let batch: Vec<IndexedEntity> = entities
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, entity)| entity.clone())
            .collect();

        let next = if batch.len() == limit {
            batch.last().map(|e| PageCursor(e.uuid()))
        } else {
            None
        };

        Ok(Page {
            entities: batch,
            next,
        })
    }

    async fn get_by_uuid(&self, kind: IndexType, uuid: &Uuid) -> Result<Option<IndexedEntity>> {
        Ok(self
            .entities
            .get(&kind)
            .and_then(|entities| entities.get(uuid).cloned()))
    }

    async fn count(&self, kind: IndexType) -> Result<u64> {
        Ok(self
            .entities
            .get(&kind)
            .map(|entities| entities.len() as u64)
            .unwrap_or(0))
    }
}
