//! Common test utilities: temporary indexes and entity stores

#![allow(dead_code)]

use async_trait::async_trait;
use component_index::models::{IndexedEntity, VulnerableSoftware};
use component_index::search::{
    FuzzyConfig, FuzzyVulnerableSoftwareSearchManager, IndexConfigBuilder, IndexRegistry,
    IndexType, SearchManager,
};
use component_index::state::{EntityStore, InMemoryStore, Page, PageCursor};
use component_index::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use uuid::Uuid;

/// Indexes in a temporary directory plus the store backing them
pub struct TestHarness {
    pub registry: Arc<IndexRegistry>,
    pub store: Arc<InMemoryStore>,
    pub search: SearchManager,
    // dropped last so the index directories outlive the registry
    _temp_dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_batch_size(1000).await
    }

    pub async fn with_batch_size(batch_size: usize) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = IndexConfigBuilder::new()
            .data_dir(temp_dir.path())
            .writer_heap_size(15_000_000)
            .reindex_batch_size(batch_size)
            .build();

        let registry = Arc::new(IndexRegistry::open(&config).await.unwrap());
        Self {
            search: SearchManager::new(registry.clone()),
            registry,
            store: Arc::new(InMemoryStore::new()),
            _temp_dir: temp_dir,
        }
    }

    /// Save to the store and stage into the index, without committing
    pub async fn save(&self, entity: impl Into<IndexedEntity>) -> IndexedEntity {
        let entity = entity.into();
        self.store.insert(entity.clone());
        self.registry.add(&entity).await.unwrap();
        entity
    }

    pub async fn commit(&self) {
        self.registry.commit_all().await.unwrap();
    }

    pub fn matcher(&self, config: FuzzyConfig) -> FuzzyVulnerableSoftwareSearchManager {
        FuzzyVulnerableSoftwareSearchManager::new(
            self.registry.clone(),
            self.store.clone() as Arc<dyn EntityStore>,
            config,
        )
    }

    pub async fn uuid_hits(&self, index_type: IndexType, uuid: Uuid) -> Vec<Uuid> {
        self.search
            .search_index(index_type, &uuid.to_string(), 10)
            .await
            .unwrap()
            .uuids(index_type)
    }
}

pub fn vulnerable_software(cpe23: &str) -> VulnerableSoftware {
    VulnerableSoftware::from_cpe23(cpe23)
}

/// Serves pages from `inner` and fails on page number `fail_on_page` (0-based)
pub struct FailingStore {
    pub inner: InMemoryStore,
    pub fail_on_page: usize,
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: InMemoryStore, fail_on_page: usize) -> Self {
        Self {
            inner,
            fail_on_page,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn fetch_page(
        &self,
        kind: IndexType,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Page> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_on_page {
            return Err(AppError::Database("connection reset".to_string()));
        }
        self.inner.fetch_page(kind, cursor, limit).await
    }

    async fn get_by_uuid(&self, kind: IndexType, uuid: &Uuid) -> Result<Option<IndexedEntity>> {
        self.inner.get_by_uuid(kind, uuid).await
    }

    async fn count(&self, kind: IndexType) -> Result<u64> {
        self.inner.count(kind).await
    }
}

/// Blocks every page fetch until released
pub struct GatedStore {
    pub inner: InMemoryStore,
    pub started: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl EntityStore for GatedStore {
    async fn fetch_page(
        &self,
        kind: IndexType,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Page> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.fetch_page(kind, cursor, limit).await
    }

    async fn get_by_uuid(&self, kind: IndexType, uuid: &Uuid) -> Result<Option<IndexedEntity>> {
        self.inner.get_by_uuid(kind, uuid).await
    }

    async fn count(&self, kind: IndexType) -> Result<u64> {
        self.inner.count(kind).await
    }
}
