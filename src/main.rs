use anyhow::Context;
use clap::{Parser, Subcommand};
use component_index::{
    config::Config,
    models::Component,
    search::{
        check_consistency, check_health, ensure_indexes, FuzzyVulnerableSoftwareSearchManager,
        IndexRegistry, IndexType, SearchManager,
    },
    state::{Corpus, EntityStore, InMemoryStore},
    telemetry::init_tracing,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "component-index")]
#[command(about = "Component search indexes and fuzzy CPE matching", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "COMPONENT_INDEX_CONFIG")]
    config: Option<String>,

    /// JSON corpus of entities backing reindex and dereferencing
    #[arg(long, env = "COMPONENT_INDEX_CORPUS")]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild one index, or all of them
    Reindex {
        #[arg(short = 't', long = "type", value_name = "INDEX_TYPE")]
        index_type: Option<IndexType>,
    },

    /// Free-text search
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Restrict to one index type
        #[arg(short = 't', long = "type", value_name = "INDEX_TYPE")]
        index_type: Option<IndexType>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Find vulnerable software candidates for a component
    Fuzzy {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        cpe: Option<String>,

        #[arg(short, long)]
        purl: Option<String>,

        #[arg(short, long)]
        group: Option<String>,

        /// Require agreement of the CPE and the fuzzy product match
        #[arg(short, long)]
        strict: bool,
    },

    /// Check index health and consistency with the corpus
    Health {
        /// Rebuild unhealthy or drifted indexes
        #[arg(long)]
        repair: bool,
    },

    /// Print index statistics
    Stats,

    /// Print Prometheus metrics
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config.observability)?;
    tracing::info!("Starting component-index v{}", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Err(e) = component_index::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    let store = Arc::new(match &cli.corpus {
        Some(path) => InMemoryStore::from_corpus(
            Corpus::from_path(path)
                .with_context(|| format!("failed to load corpus {}", path.display()))?,
        ),
        None => InMemoryStore::new(),
    });

    let registry = Arc::new(
        IndexRegistry::open(&config.index)
            .await
            .context("failed to open indexes")?,
    );

    match cli.command {
        Commands::Reindex { index_type } => {
            let types = match index_type {
                Some(index_type) => vec![index_type],
                None => IndexType::ALL.to_vec(),
            };
            for index_type in types {
                let indexed = registry.reindex(index_type, &*store).await?;
                println!("{}: {} documents", index_type, indexed);
            }
        }
        Commands::Search {
            query,
            index_type,
            limit,
        } => {
            let search = SearchManager::new(registry.clone());
            let results = match index_type {
                Some(index_type) => search.search_index(index_type, &query, limit).await?,
                None => search.search_indices(&query, limit).await?,
            };
            println!("{}", serde_json::to_string_pretty(results.results())?);
        }
        Commands::Fuzzy {
            name,
            cpe,
            purl,
            group,
            strict,
        } => {
            let mut component = Component::new(name);
            component.cpe = cpe;
            component.purl = purl;
            component.group = group;

            let matcher = FuzzyVulnerableSoftwareSearchManager::new(
                registry.clone(),
                store.clone() as Arc<dyn EntityStore>,
                config.fuzzy.clone(),
            );
            let candidates = matcher.fuzzy_match(&component, strict).await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Commands::Health { repair } => {
            for index_type in IndexType::ALL {
                let health = check_health(registry.get(index_type)?)?;
                println!("{}: {:?}", index_type, health);
            }
            let reports = check_consistency(
                &registry,
                &*store,
                config.index.consistency_delta_threshold,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);

            if repair {
                let rebuilt = ensure_indexes(&registry, &*store).await?;
                println!("rebuilt: {:?}", rebuilt);
            }
        }
        Commands::Stats => {
            println!("{}", serde_json::to_string_pretty(&registry.stats()?)?);
        }
        Commands::Metrics => {
            print!("{}", component_index::metrics::gather_metrics());
        }
    }

    Ok(())
}
