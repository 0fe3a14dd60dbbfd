//! Startup health and consistency checks

use crate::search::document::IndexType;
use crate::search::error::IndexResult;
use crate::search::index::IndexManager;
use crate::search::registry::IndexRegistry;
use crate::state::EntityStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "files", rename_all = "lowercase")]
pub enum IndexHealth {
    Healthy,
    /// Opens and validates, but holds no committed documents
    Empty,
    /// Files whose checksum does not validate
    Corrupted(Vec<PathBuf>),
}

/// Document counts of the store and the index for one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub index_type: IndexType,
    pub store_count: u64,
    pub index_count: u64,
    /// Difference relative to the store count, in percent
    pub delta_percent: f64,
    pub consistent: bool,
}

pub fn check_health(manager: &IndexManager) -> IndexResult<IndexHealth> {
    let corrupted = manager.validate()?;
    if !corrupted.is_empty() {
        tracing::warn!(
            index = %manager.index_type(),
            files = corrupted.len(),
            "Index checksum validation failed"
        );
        return Ok(IndexHealth::Corrupted(corrupted));
    }
    if manager.num_docs() == 0 {
        return Ok(IndexHealth::Empty);
    }
    Ok(IndexHealth::Healthy)
}

fn delta_percent(store_count: u64, index_count: u64) -> f64 {
    if store_count == 0 {
        return if index_count == 0 { 0.0 } else { 100.0 };
    }
    let delta = store_count.abs_diff(index_count) as f64;
    delta / store_count as f64 * 100.0
}

/// Compare committed documents against live entities for every type
pub async fn check_consistency(
    registry: &IndexRegistry,
    store: &dyn EntityStore,
    threshold_percent: f64,
) -> IndexResult<Vec<ConsistencyReport>> {
    let mut reports = Vec::with_capacity(IndexType::ALL.len());

    for index_type in IndexType::ALL {
        let store_count = store.count(index_type).await?;
        let index_count = registry.get(index_type)?.num_docs();
        let delta_percent = delta_percent(store_count, index_count);
        let consistent = delta_percent <= threshold_percent;

        if !consistent {
            tracing::warn!(
                index = %index_type,
                store_count,
                index_count,
                delta_percent,
                threshold_percent,
                "Index drifted from the store"
            );
        }

        reports.push(ConsistencyReport {
            index_type,
            store_count,
            index_count,
            delta_percent,
            consistent,
        });
    }

    Ok(reports)
}

/// Reindex every type that is corrupted, empty while the store is not, or
/// drifted beyond the configured threshold. Returns the rebuilt types.
pub async fn ensure_indexes(
    registry: &IndexRegistry,
    store: &dyn EntityStore,
) -> IndexResult<Vec<IndexType>> {
    let threshold = registry.config().consistency_delta_threshold;
    let reports = check_consistency(registry, store, threshold).await?;
    let mut rebuilt = Vec::new();

    for report in reports {
        let manager = registry.get(report.index_type)?;
        let health = check_health(manager)?;

        let needs_rebuild = match health {
            IndexHealth::Corrupted(_) => true,
            IndexHealth::Empty => report.store_count > 0,
            IndexHealth::Healthy => !report.consistent,
        };

        if needs_rebuild {
            tracing::info!(index = %report.index_type, ?health, "Rebuilding index");
            manager.reindex(store).await?;
            rebuilt.push(report.index_type);
        }
    }

    Ok(rebuilt)
}
