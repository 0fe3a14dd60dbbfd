//! Per-entity full-text indexes powered by Tantivy
//!
//! One on-disk index is kept for each entity kind (projects, components,
//! services, licenses, CPEs and vulnerable software). On top of them sit a
//! fan-out search coordinator and a fuzzy matcher that looks up vulnerable
//! software candidates for a component.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  SearchManager        FuzzyVulnerableSoftware-  │
//! │  - search_index()     SearchManager             │
//! │  - search_indices()   - fuzzy_match()           │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │  IndexRegistry: one IndexManager per IndexType  │
//! │  - add / remove / commit / reindex              │
//! │  - one writer each, manually reloaded reader    │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │  <data_dir>/index/<type>  (Tantivy index)       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Writes become visible only after an explicit `commit`.
//!
//! # Example
//!
//! ```no_run
//! use component_index::models::{Component, IndexedEntity};
//! use component_index::search::{IndexConfig, IndexRegistry, SearchManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(IndexRegistry::open(&IndexConfig::default()).await?);
//!
//!     let component = IndexedEntity::from(Component::new("crypto-library").with_group("acme"));
//!     registry.add(&component).await?;
//!     registry.commit_all().await?;
//!
//!     let search = SearchManager::new(registry);
//!     let results = search.search_indices("crypto", 20).await?;
//!     println!("Found {} rows", results.total_hits());
//!
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod fuzzy;
mod health;
mod index;
mod query;
mod registry;
mod service;

pub use config::{FuzzyConfig, IndexConfig, IndexConfigBuilder};
pub use document::{
    register_tokenizers, FieldKind, FieldSpec, IndexSchema, IndexType, IndexedDocument,
    SearchDocument, RAW_TOKENIZER, UUID_FIELD,
};
pub use error::{IndexResult, SearchError};
pub use fuzzy::FuzzyVulnerableSoftwareSearchManager;
pub use health::{check_consistency, check_health, ensure_indexes, ConsistencyReport, IndexHealth};
pub use index::{IndexManager, IndexStats};
pub use query::{QueryBuilder, SearchResult, SearchRow};
pub use registry::IndexRegistry;
pub use service::SearchManager;
