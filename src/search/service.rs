//! Fan-out search across the per-type indexes

use crate::search::document::IndexType;
use crate::search::error::{IndexResult, SearchError};
use crate::search::index::IndexManager;
use crate::search::query::{SearchResult, SearchRow};
use crate::search::registry::IndexRegistry;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tantivy::query::Query;

/// Main search service
pub struct SearchManager {
    registry: Arc<IndexRegistry>,
}

impl SearchManager {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Search one index; the result holds a single bucket of at most `limit` rows
    pub async fn search_index(
        &self,
        index_type: IndexType,
        query: &str,
        limit: usize,
    ) -> IndexResult<SearchResult> {
        let query = validate_query(query)?;
        let rows = self.search_rows(index_type, query, limit).await?;

        let mut result = SearchResult::new();
        result.add_result_set(index_type, rows);
        Ok(result)
    }

    /// Search all six indexes concurrently; `limit` bounds each bucket independently
    pub async fn search_indices(&self, query: &str, limit: usize) -> IndexResult<SearchResult> {
        let query = validate_query(query)?;
        let start_time = Instant::now();

        let searches = IndexType::ALL.iter().map(|index_type| async move {
            let rows = self.search_rows(*index_type, query, limit).await?;
            Ok::<_, SearchError>((*index_type, rows))
        });
        let buckets = try_join_all(searches).await?;

        let mut result = SearchResult::new();
        for (index_type, rows) in buckets {
            result.add_result_set(index_type, rows);
        }

        tracing::debug!(
            query,
            total_hits = result.total_hits(),
            search_time_ms = start_time.elapsed().as_millis() as u64,
            "Aggregate search complete"
        );
        Ok(result)
    }

    /// Run a prepared query against one index
    pub async fn search_with_query(
        &self,
        index_type: IndexType,
        query: Box<dyn Query>,
        limit: usize,
    ) -> IndexResult<Vec<SearchRow>> {
        let manager = self.registry.get(index_type)?.clone();
        run_blocking(index_type, move || manager.search(query.as_ref(), limit)).await
    }

    async fn search_rows(
        &self,
        index_type: IndexType,
        query: &str,
        limit: usize,
    ) -> IndexResult<Vec<SearchRow>> {
        let manager: Arc<IndexManager> = self.registry.get(index_type)?.clone();
        let text = query.to_string();
        run_blocking(index_type, move || manager.search_text(&text, limit)).await
    }

    pub async fn search_project_index(&self, query: &str, limit: usize) -> IndexResult<SearchResult> {
        self.search_index(IndexType::Project, query, limit).await
    }

    pub async fn search_component_index(
        &self,
        query: &str,
        limit: usize,
    ) -> IndexResult<SearchResult> {
        self.search_index(IndexType::Component, query, limit).await
    }

    pub async fn search_service_component_index(
        &self,
        query: &str,
        limit: usize,
    ) -> IndexResult<SearchResult> {
        self.search_index(IndexType::ServiceComponent, query, limit).await
    }

    pub async fn search_license_index(&self, query: &str, limit: usize) -> IndexResult<SearchResult> {
        self.search_index(IndexType::License, query, limit).await
    }

    pub async fn search_cpe_index(&self, query: &str, limit: usize) -> IndexResult<SearchResult> {
        self.search_index(IndexType::Cpe, query, limit).await
    }

    pub async fn search_vulnerable_software_index(
        &self,
        query: &str,
        limit: usize,
    ) -> IndexResult<SearchResult> {
        self.search_index(IndexType::VulnerableSoftware, query, limit).await
    }
}

fn validate_query(query: &str) -> IndexResult<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(
            "search query must not be blank".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Searches are CPU and disk bound; keep them off the async workers
async fn run_blocking<F>(index_type: IndexType, search: F) -> IndexResult<Vec<SearchRow>>
where
    F: FnOnce() -> IndexResult<Vec<SearchRow>> + Send + 'static,
{
    tokio::task::spawn_blocking(search)
        .await
        .map_err(|e| SearchError::unavailable(index_type, format!("search task failed: {}", e)))?
}
