//! Prometheus metrics for the index and fuzzy matching subsystems.
//!
//! Collectors are global and usable before `init_metrics` is called; registration
//! only controls whether they show up in `gather_metrics` output.
//!
//! # Example
//! ```no_run
//! use component_index::metrics::SEARCH_INDEX_OPERATIONS_TOTAL;
//!
//! SEARCH_INDEX_OPERATIONS_TOTAL
//!     .with_label_values(&["component", "add"])
//!     .inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "component_index";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Index mutations and maintenance operations
    ///
    /// Labels: index, operation (add, remove, commit, reindex, reindex_failed)
    pub static ref SEARCH_INDEX_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_index_operations_total", "Total number of index operations")
            .namespace(NAMESPACE),
        &["index", "operation"]
    ).expect("Failed to create SEARCH_INDEX_OPERATIONS_TOTAL metric");

    /// Committed documents per index
    ///
    /// Labels: index
    pub static ref SEARCH_INDEX_DOCUMENTS: GaugeVec = GaugeVec::new(
        Opts::new("search_index_documents", "Number of committed documents per index")
            .namespace(NAMESPACE),
        &["index"]
    ).expect("Failed to create SEARCH_INDEX_DOCUMENTS metric");

    /// Query latency per index
    ///
    /// Labels: index
    pub static ref SEARCH_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_query_duration_seconds",
            "Search query duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["index"]
    ).expect("Failed to create SEARCH_QUERY_DURATION_SECONDS metric");

    /// Vulnerable-software candidates returned by the fuzzy matcher
    ///
    /// Labels: mode (strict, lenient)
    pub static ref FUZZY_MATCH_CANDIDATES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("fuzzy_match_candidates_total", "Total fuzzy match candidates returned")
            .namespace(NAMESPACE),
        &["mode"]
    ).expect("Failed to create FUZZY_MATCH_CANDIDATES_TOTAL metric");
}

/// Register all collectors with the global registry.
///
/// Safe to call more than once; collectors that are already registered are skipped.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(Box::new(SEARCH_INDEX_OPERATIONS_TOTAL.clone()))?;
    register(Box::new(SEARCH_INDEX_DOCUMENTS.clone()))?;
    register(Box::new(SEARCH_QUERY_DURATION_SECONDS.clone()))?;
    register(Box::new(FUZZY_MATCH_CANDIDATES_TOTAL.clone()))?;

    tracing::info!("Metrics initialized");
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<(), prometheus::Error> {
    match PROMETHEUS_REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Gather all registered metrics in Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_recorded_metric() {
        init_metrics().unwrap();
        SEARCH_INDEX_OPERATIONS_TOTAL
            .with_label_values(&["license", "add"])
            .inc();

        let output = gather_metrics();
        assert!(output.contains("component_index_search_index_operations_total"));
    }
}
