pub mod store;

pub use store::*;

use crate::error::Result;
use crate::models::IndexedEntity;
use crate::search::IndexType;
use async_trait::async_trait;
use uuid::Uuid;

/// Position after the last entity of a page; entities are paged in UUID order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageCursor(pub Uuid);

/// One bounded batch of entities
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entities: Vec<IndexedEntity>,
    /// Cursor for the following page, `None` when exhausted
    pub next: Option<PageCursor>,
}

/// Read access to the persistence layer that owns the indexed entities
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch up to `limit` entities of `kind` that sort after `cursor`
    async fn fetch_page(
        &self,
        kind: IndexType,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Page>;

    /// Get a live entity by UUID
    async fn get_by_uuid(&self, kind: IndexType, uuid: &Uuid) -> Result<Option<IndexedEntity>>;

    /// Number of live entities of `kind`
    async fn count(&self, kind: IndexType) -> Result<u64>;
}
