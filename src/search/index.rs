//! Per-type index management

use crate::metrics::{
    SEARCH_INDEX_DOCUMENTS, SEARCH_INDEX_OPERATIONS_TOTAL, SEARCH_QUERY_DURATION_SECONDS,
};
use crate::models::IndexedEntity;
use crate::search::config::IndexConfig;
use crate::search::document::{
    register_tokenizers, IndexSchema, IndexType, IndexedDocument, SearchDocument, UUID_FIELD,
};
use crate::search::error::{IndexResult, SearchError};
use crate::search::query::{QueryBuilder, SearchRow};
use crate::state::{EntityStore, PageCursor};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::indexer::UserOperation;
use tantivy::query::{Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_type: IndexType,

    /// Committed documents visible to searchers
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Last commit made by this process
    pub last_commit: Option<DateTime<Utc>>,

    /// Uncommitted changes are pending
    pub dirty: bool,
}

/// Owns the on-disk index of one entity kind
pub struct IndexManager {
    index_type: IndexType,
    descriptor: &'static IndexSchema,

    /// The Tantivy index
    index: Index,

    /// The schema
    schema: Schema,

    uuid_field: Field,

    /// Index writer, one per index for the lifetime of the manager
    writer: Arc<RwLock<IndexWriter>>,

    /// Index reader, reloaded after every commit
    reader: IndexReader,

    path: PathBuf,
    dirty: AtomicBool,
    last_commit: Mutex<Option<DateTime<Utc>>>,
    reindex_lock: tokio::sync::Mutex<()>,
    config: IndexConfig,
}

impl IndexManager {
    /// Open the index for `index_type` under `<data_dir>/index/<type>`, creating it if absent.
    ///
    /// Fails with `IndexUnavailable` when the directory cannot be created, the
    /// existing index cannot be opened, or another writer holds the lock.
    pub async fn open(index_type: IndexType, config: &IndexConfig) -> IndexResult<Self> {
        let path = config.index_root().join(index_type.name());
        let descriptor = index_type.schema();
        let unavailable = |e: &dyn std::fmt::Display| SearchError::unavailable(index_type, e);

        std::fs::create_dir_all(&path)
            .map_err(|e| unavailable(&format!("failed to create index directory: {}", e)))?;

        let index = if Self::index_exists(&path) {
            Index::open_in_dir(&path)
                .map_err(|e| unavailable(&format!("failed to open existing index: {}", e)))?
        } else {
            Index::create_in_dir(&path, descriptor.build())
                .map_err(|e| unavailable(&format!("failed to create new index: {}", e)))?
        };
        register_tokenizers(&index);

        let schema = index.schema();
        for spec in descriptor.fields {
            if schema.get_field(spec.name).is_err() {
                return Err(unavailable(&format!(
                    "on-disk schema lacks field '{}'; delete the directory and reindex",
                    spec.name
                )));
            }
        }
        let uuid_field = schema
            .get_field(UUID_FIELD)
            .map_err(|e| unavailable(&e))?;

        let writer: IndexWriter = index
            .writer_with_num_threads(config.indexing_threads.max(1), config.writer_heap_size)
            .map_err(|e| unavailable(&format!("failed to acquire writer: {}", e)))?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| {
                unavailable(&format!("failed to create reader: {}", e))
            })?;

        tracing::info!(index = %index_type, path = %path.display(), "Index opened");

        let manager = Self {
            index_type,
            descriptor,
            index,
            schema,
            uuid_field,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            path,
            dirty: AtomicBool::new(false),
            last_commit: Mutex::new(None),
            reindex_lock: tokio::sync::Mutex::new(()),
            config: config.clone(),
        };
        manager.record_document_count();
        Ok(manager)
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn descriptor(&self) -> &'static IndexSchema {
        self.descriptor
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ordered field names eligible for free-text querying; `uuid` comes first
    pub fn search_fields(&self) -> Vec<&'static str> {
        self.descriptor.search_fields()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn uuid_term(&self, uuid: &Uuid) -> Term {
        Term::from_field_text(self.uuid_field, &uuid.to_string())
    }

    fn check_kind(&self, entity: &IndexedEntity) -> IndexResult<()> {
        if entity.index_type() != self.index_type {
            return Err(SearchError::SchemaMismatch {
                expected: self.index_type,
                actual: entity.index_type(),
            });
        }
        Ok(())
    }

    fn stage(&self, writer: &IndexWriter, entity: &IndexedEntity) -> IndexResult<()> {
        self.check_kind(entity)?;
        let document = IndexedDocument::from(entity);
        // one batch, so concurrent upserts of the same UUID cannot interleave
        writer.run([
            UserOperation::Delete(self.uuid_term(&document.uuid)),
            UserOperation::Add(document.to_tantivy_doc(&self.schema)),
        ])?;
        Ok(())
    }

    fn count_operation(&self, operation: &str) {
        SEARCH_INDEX_OPERATIONS_TOTAL
            .with_label_values(&[self.index_type.name().as_str(), operation])
            .inc();
    }

    fn record_document_count(&self) {
        SEARCH_INDEX_DOCUMENTS
            .with_label_values(&[self.index_type.name().as_str()])
            .set(self.num_docs() as f64);
    }

    /// Upsert the document derived from `entity`; visible after the next `commit`
    pub async fn add(&self, entity: &IndexedEntity) -> IndexResult<()> {
        // shared: only commit, rollback and reindex hold the writer exclusively
        let writer = self.writer.read().await;
        self.stage(&writer, entity)?;
        self.dirty.store(true, Ordering::SeqCst);
        self.count_operation("add");

        tracing::debug!(index = %self.index_type, uuid = %entity.uuid(), "Document staged");
        Ok(())
    }

    /// Delete the document for `entity`; absent documents are not an error
    pub async fn remove(&self, entity: &IndexedEntity) -> IndexResult<()> {
        self.check_kind(entity)?;
        self.remove_by_uuid(&entity.uuid()).await
    }

    pub async fn remove_by_uuid(&self, uuid: &Uuid) -> IndexResult<()> {
        let writer = self.writer.read().await;
        writer.delete_term(self.uuid_term(uuid));
        self.dirty.store(true, Ordering::SeqCst);
        self.count_operation("remove");

        tracing::debug!(index = %self.index_type, uuid = %uuid, "Document delete staged");
        Ok(())
    }

    /// Commit pending changes and refresh the reader. No-op when nothing is pending.
    pub async fn commit(&self) -> IndexResult<()> {
        if !self.is_dirty() {
            return Ok(());
        }

        let mut writer = self.writer.write().await;
        if !self.is_dirty() {
            return Ok(());
        }
        let opstamp = writer
            .commit()
            .map_err(|e| SearchError::unavailable(self.index_type, format!("commit failed: {}", e)))?;
        self.dirty.store(false, Ordering::SeqCst);
        drop(writer);

        self.after_commit()?;
        self.count_operation("commit");
        tracing::debug!(index = %self.index_type, opstamp, "Index committed");
        Ok(())
    }

    fn after_commit(&self) -> IndexResult<()> {
        *self.last_commit.lock() = Some(Utc::now());
        self.reader
            .reload()
            .map_err(|e| SearchError::unavailable(self.index_type, format!("reader reload failed: {}", e)))?;
        self.record_document_count();
        Ok(())
    }

    /// Replace the whole index with documents for every live entity of this kind.
    ///
    /// Entities are fetched in pages of `reindex_batch_size` and become visible
    /// through one final commit. On failure the writer is rolled back and
    /// searchers keep seeing the previous commit. Returns the number of
    /// documents indexed.
    pub async fn reindex(&self, store: &dyn EntityStore) -> IndexResult<u64> {
        let _guard = self
            .reindex_lock
            .try_lock()
            .map_err(|_| SearchError::ReindexInProgress(self.index_type))?;

        let started = Instant::now();
        tracing::info!(index = %self.index_type, "Reindex started");

        let mut writer = self.writer.write().await;
        if self.is_dirty() {
            writer.commit().map_err(|e| self.reindex_failed(e))?;
            self.dirty.store(false, Ordering::SeqCst);
            self.after_commit()?;
        }

        let indexed = match self.rebuild(&writer, store).await {
            Ok(indexed) => indexed,
            Err(e) => {
                self.abort_rebuild(&mut writer);
                return Err(self.reindex_failed(e));
            }
        };

        if let Err(e) = writer.commit() {
            self.abort_rebuild(&mut writer);
            return Err(self.reindex_failed(e));
        }
        drop(writer);
        self.after_commit()?;
        self.count_operation("reindex");

        tracing::info!(
            index = %self.index_type,
            documents = indexed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reindex complete"
        );
        Ok(indexed)
    }

    async fn rebuild(&self, writer: &IndexWriter, store: &dyn EntityStore) -> IndexResult<u64> {
        writer.delete_all_documents()?;

        let batch_size = self.config.reindex_batch_size.max(1);
        let mut cursor: Option<PageCursor> = None;
        let mut indexed = 0u64;

        loop {
            let page = store
                .fetch_page(self.index_type, cursor.as_ref(), batch_size)
                .await?;

            for entity in &page.entities {
                self.stage(writer, entity)?;
                indexed += 1;
            }
            tracing::debug!(index = %self.index_type, batch = page.entities.len(), indexed, "Reindex batch staged");

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
            tokio::task::yield_now().await;
        }

        Ok(indexed)
    }

    fn abort_rebuild(&self, writer: &mut IndexWriter) {
        self.count_operation("reindex_failed");
        if let Err(e) = writer.rollback() {
            tracing::error!(index = %self.index_type, error = %e, "Rollback after failed reindex failed");
        }
    }

    fn reindex_failed(&self, err: impl std::fmt::Display) -> SearchError {
        tracing::error!(index = %self.index_type, error = %err, "Reindex failed, previous index kept");
        SearchError::ReindexFailed {
            index: self.index_type,
            reason: err.to_string(),
        }
    }

    /// Run `query` against a fresh snapshot, returning at most `limit` rows
    /// (clamped to `max_results`) in descending score order.
    pub fn search(&self, query: &dyn Query, limit: usize) -> IndexResult<Vec<SearchRow>> {
        let limit = limit.min(self.config.max_results);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let timer = SEARCH_QUERY_DURATION_SECONDS
            .with_label_values(&[self.index_type.name().as_str()])
            .start_timer();

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::unavailable(self.index_type, format!("search failed: {}", e)))?;

        let mut rows = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            rows.push(self.row(&doc));
        }

        timer.observe_duration();
        Ok(rows)
    }

    /// Free-text search across `search_fields()`
    pub fn search_text(&self, text: &str, limit: usize) -> IndexResult<Vec<SearchRow>> {
        let query = QueryBuilder::new(self).build(text)?;
        self.search(query.as_ref(), limit)
    }

    /// Stored row of the document with `uuid`, if committed
    pub fn get_document(&self, uuid: &Uuid) -> IndexResult<Option<SearchRow>> {
        let query = TermQuery::new(self.uuid_term(uuid), IndexRecordOption::Basic);
        Ok(self.search(&query, 1)?.into_iter().next())
    }

    fn row(&self, doc: &TantivyDocument) -> SearchRow {
        self.descriptor
            .fields
            .iter()
            .filter_map(|spec| {
                let field = self.schema.get_field(spec.name).ok()?;
                let value = doc.get_first(field).and_then(|v| v.as_str())?;
                Some((spec.name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Committed document count
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        let searcher = self.reader.searcher();

        let index_size_bytes = std::fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        IndexStats {
            index_type: self.index_type,
            total_documents: searcher.num_docs(),
            index_size_bytes,
            num_segments: searcher.segment_readers().len(),
            last_commit: *self.last_commit.lock(),
            dirty: self.is_dirty(),
        }
    }

    /// Verify checksums of all managed files; returns the corrupted ones
    pub fn validate(&self) -> IndexResult<Vec<PathBuf>> {
        let corrupted = self
            .index
            .validate_checksum()
            .map_err(|e| SearchError::unavailable(self.index_type, format!("checksum validation failed: {}", e)))?;
        let mut files: Vec<PathBuf> = corrupted.into_iter().collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, License};
    use crate::search::config::IndexConfigBuilder;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> IndexConfig {
        IndexConfigBuilder::new()
            .data_dir(temp_dir.path())
            .writer_heap_size(15_000_000)
            .build()
    }

    #[tokio::test]
    async fn test_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(IndexType::Component, &test_config(&temp_dir))
            .await
            .unwrap();

        assert!(temp_dir.path().join("index/component/meta.json").exists());
        assert_eq!(manager.stats().total_documents, 0);
        assert_eq!(manager.search_fields()[0], "uuid");
    }

    #[tokio::test]
    async fn test_commit_without_changes_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(IndexType::License, &test_config(&temp_dir))
            .await
            .unwrap();

        manager.commit().await.unwrap();
        assert!(manager.stats().last_commit.is_none());
    }

    #[tokio::test]
    async fn test_rejects_entity_of_other_kind() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(IndexType::License, &test_config(&temp_dir))
            .await
            .unwrap();

        let entity = IndexedEntity::from(Component::new("crypto-library"));
        let err = manager.add(&entity).await.unwrap_err();
        assert!(matches!(err, SearchError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_get_document_after_commit() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(IndexType::License, &test_config(&temp_dir))
            .await
            .unwrap();

        let license = License::new("MIT", "MIT License");
        let uuid = license.uuid;
        manager.add(&license.into()).await.unwrap();
        assert!(manager.is_dirty());
        assert!(manager.get_document(&uuid).unwrap().is_none());

        manager.commit().await.unwrap();
        let row = manager.get_document(&uuid).unwrap().unwrap();
        assert_eq!(row.get("licenseId").map(String::as_str), Some("MIT"));
        assert!(!manager.stats().dirty);
    }

    #[tokio::test]
    async fn test_second_manager_on_same_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let _first = IndexManager::open(IndexType::Cpe, &config).await.unwrap();

        let second = IndexManager::open(IndexType::Cpe, &config).await;
        assert!(matches!(second, Err(SearchError::IndexUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_validate_fresh_index() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(IndexType::Project, &test_config(&temp_dir))
            .await
            .unwrap();
        assert!(manager.validate().unwrap().is_empty());
    }
}
