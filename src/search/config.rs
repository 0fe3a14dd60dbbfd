//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Index subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Data directory; each index lives under `<data_dir>/index/<type>`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Number of threads used by each index writer
    #[serde(default = "default_indexing_threads")]
    pub indexing_threads: usize,

    /// Entities fetched per page while reindexing
    #[serde(default = "default_reindex_batch_size")]
    pub reindex_batch_size: usize,

    /// Upper bound on rows returned per index type
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Percentage of drift between store and index that triggers a reindex
    #[serde(default = "default_consistency_delta_threshold")]
    pub consistency_delta_threshold: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            writer_heap_size: default_writer_heap_size(),
            indexing_threads: default_indexing_threads(),
            reindex_batch_size: default_reindex_batch_size(),
            max_results: default_max_results(),
            consistency_delta_threshold: default_consistency_delta_threshold(),
        }
    }
}

impl IndexConfig {
    /// Root directory holding one sub-directory per index type
    pub fn index_root(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}

/// Builder for IndexConfig
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn reindex_batch_size(mut self, size: usize) -> Self {
        self.config.reindex_batch_size = size;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn consistency_delta_threshold(mut self, percent: f64) -> Self {
        self.config.consistency_delta_threshold = percent;
        self
    }

    pub fn build(self) -> IndexConfig {
        self.config
    }
}

impl Default for IndexConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fuzzy vulnerable-software matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Minimum similarity for approximate product matching (0.0 - 1.0)
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Maximum hits fetched per underlying query
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Default strictness used by `fuzzy_match_default`
    #[serde(default)]
    pub strict: bool,

    /// Skip components that carry a package URL (except `deb`)
    #[serde(default)]
    pub exclude_components_with_purl: bool,

    /// Names that are never fuzzed
    #[serde(default = "default_do_not_fuzz")]
    pub do_not_fuzz: Vec<String>,

    /// Package URL types for which edit-distance matching is skipped
    #[serde(default = "default_skip_fuzzing_for_purl_types")]
    pub skip_fuzzing_for_purl_types: Vec<String>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            max_candidates: default_max_candidates(),
            strict: false,
            exclude_components_with_purl: false,
            do_not_fuzz: default_do_not_fuzz(),
            skip_fuzzing_for_purl_types: default_skip_fuzzing_for_purl_types(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_writer_heap_size() -> usize {
    50_000_000 // 50MB
}

fn default_indexing_threads() -> usize {
    1
}

fn default_reindex_batch_size() -> usize {
    1000
}

fn default_max_results() -> usize {
    1000
}

fn default_consistency_delta_threshold() -> f64 {
    20.0
}

fn default_min_similarity() -> f32 {
    0.88
}

fn default_max_candidates() -> usize {
    1000
}

fn default_do_not_fuzz() -> Vec<String> {
    ["util", "utils", "url", "xml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_skip_fuzzing_for_purl_types() -> Vec<String> {
    vec!["golang".to_string()]
}
