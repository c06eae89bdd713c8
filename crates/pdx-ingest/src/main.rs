//! PDX Ingest - partner directory harvester

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdx_common::logging::{init_logging, LogConfig, LogLevel};
use pdx_ingest::dedup::{DedupIndex, FileDedupIndex, MemoryDedupIndex};
use pdx_ingest::directory::{ApiFetchStrategy, PartitionScheme};
use pdx_ingest::orchestrator::{IngestionOrchestrator, RunSummary};
use pdx_ingest::versioning::{DocumentStore, MemoryDocumentStore, VersionStore};
use pdx_ingest::IngestConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pdx-ingest")]
#[command(author, version, about = "Partner directory harvester")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scheme {
    Letters,
    Countries,
}

impl From<Scheme> for PartitionScheme {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Letters => PartitionScheme::Letters,
            Scheme::Countries => PartitionScheme::Countries,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest partners and update the versioned store
    Run {
        /// Partitioning of the directory
        #[arg(short, long, value_enum, default_value = "letters")]
        scheme: Scheme,

        /// Only these partitions (letters or country codes)
        #[arg(short, long, value_delimiter = ',')]
        partitions: Vec<String>,

        /// Use an in-memory store and dedup index; nothing is persisted
        #[arg(long)]
        dry_run: bool,

        /// Fetch the full detail payload for every partner
        #[arg(long)]
        fetch_details: bool,

        /// Processed-id log
        #[arg(long, env = "PDX_DEDUP_FILE")]
        dedup_file: Option<PathBuf>,
    },

    /// List the partitions of a scheme
    Partitions {
        #[arg(short, long, value_enum, default_value = "letters")]
        scheme: Scheme,
    },

    /// Show every stored version of a partner
    #[cfg(feature = "database")]
    History {
        entity_id: String,
    },

    /// Apply database migrations
    #[cfg(feature = "database")]
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("pdx-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = IngestConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Run {
            scheme,
            partitions,
            dry_run,
            fetch_details,
            dedup_file,
        } => {
            if fetch_details {
                config.fetch_details = true;
            }
            if let Some(path) = dedup_file {
                config.dedup_file = path;
            }
            config.validate()?;

            let partitions = PartitionScheme::from(scheme).select(partitions.as_slice())?;
            let summary = run(&config, &partitions, dry_run).await?;
            print_summary(&summary);

            if summary.has_aborted() {
                bail!(
                    "{} partition(s) aborted after retry exhaustion",
                    summary.totals().aborted_partitions
                );
            }
        },
        Command::Partitions { scheme } => {
            for partition in PartitionScheme::from(scheme).enumerate() {
                println!("{:<4} {}", partition.key, partition);
            }
        },
        #[cfg(feature = "database")]
        Command::History { entity_id } => {
            let store = connect(&config).await?;
            let history = store.history(&entity_id).await?;
            if history.is_empty() {
                println!("No versions stored for {entity_id}");
            }
            for v in history {
                println!(
                    "v{:<3} {:<8} {}  {}  [{}]",
                    v.version,
                    v.status.as_str(),
                    v.last_modified.to_rfc3339(),
                    v.record.name(),
                    v.locations.iter().cloned().collect::<Vec<_>>().join(",")
                );
            }
        },
        #[cfg(feature = "database")]
        Command::Migrate => {
            let store = connect(&config).await?;
            store.migrate().await?;
            println!("Migrations applied");
        },
    }

    Ok(())
}

async fn run(
    config: &IngestConfig,
    partitions: &[pdx_ingest::directory::Partition],
    dry_run: bool,
) -> Result<RunSummary> {
    let strategy = Arc::new(ApiFetchStrategy::new(config.directory.clone())?);

    let documents: Arc<dyn DocumentStore>;
    let dedup: Arc<dyn DedupIndex>;
    if dry_run {
        warn!("Dry run: results are kept in memory only");
        documents = Arc::new(MemoryDocumentStore::new());
        dedup = Arc::new(MemoryDedupIndex::new());
    } else {
        let index = FileDedupIndex::open(&config.dedup_file).with_context(|| {
            format!("Failed to open dedup index {}", config.dedup_file.display())
        })?;
        documents = persistent_store(config).await?;
        dedup = Arc::new(index);
    }

    info!(partitions = partitions.len(), dry_run, "Starting harvest");
    let orchestrator =
        IngestionOrchestrator::from_config(config, strategy, VersionStore::new(documents), dedup);
    Ok(orchestrator.run(partitions).await)
}

#[cfg(feature = "database")]
async fn connect(config: &IngestConfig) -> Result<pdx_ingest::versioning::PgDocumentStore> {
    pdx_ingest::versioning::PgDocumentStore::connect(&config.database)
        .await
        .context("Failed to connect to database")
}

#[cfg(feature = "database")]
async fn persistent_store(config: &IngestConfig) -> Result<Arc<dyn DocumentStore>> {
    Ok(Arc::new(connect(config).await?))
}

#[cfg(not(feature = "database"))]
async fn persistent_store(_config: &IngestConfig) -> Result<Arc<dyn DocumentStore>> {
    bail!("Persistent storage requires the `database` feature; use --dry-run")
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{:<6} {:>5} {:>6} {:>7} {:>5} {:>9} {:>8} {:>7} {:>6}  status",
        "part", "pages", "items", "skipped", "new", "unchanged", "location", "changed", "failed"
    );
    for p in &summary.partitions {
        println!(
            "{:<6} {:>5} {:>6} {:>7} {:>5} {:>9} {:>8} {:>7} {:>6}  {}",
            p.partition,
            p.pages,
            p.items_seen,
            p.skipped,
            p.new,
            p.unchanged,
            p.location_only,
            p.changed,
            p.failed,
            p.status
        );
    }

    let t = summary.totals();
    println!(
        "{:<6} {:>5} {:>6} {:>7} {:>5} {:>9} {:>8} {:>7} {:>6}  {} completed, {} aborted",
        "total",
        t.pages,
        t.items_seen,
        t.skipped,
        t.new,
        t.unchanged,
        t.location_only,
        t.changed,
        t.failed,
        t.completed_partitions,
        t.aborted_partitions
    );
}
