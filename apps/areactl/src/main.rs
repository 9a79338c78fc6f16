//! Operator tool for the area index.
//!
//! Usage: areactl [--data-dir DIR] <command>

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use areaindex::{
    create_area, normalize_name_key, AreaDraft, AreaIndex, AreaIndexWatcher, IndexConfig,
    IndexResult,
};
use clap::{Parser, Subcommand};
use docstore::{DocumentKey, DocumentKind, DocumentStore, FileDocumentStore};

#[derive(Parser)]
#[command(name = "areactl")]
#[command(about = "Inspect and maintain the area document store and its index.")]
struct Cli {
    /// Data directory (default: $WORLDSTORE_DATA_DIR or ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rescan every area document and rewrite the index cache.
    Rebuild,
    /// List areas whose name contains TERM (case-sensitive).
    Search {
        term: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Resolve an area name to its id.
    Lookup { name: String },
    /// Print the stored area document.
    Show { id: String },
    /// Create or replace an area and index it.
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Reuse an existing id instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// Print index state and counters as JSON.
    Status,
    /// Keep the index in sync with on-disk edits until Ctrl+C.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = IndexConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: IndexConfig) -> IndexResult<()> {
    let store = Arc::new(FileDocumentStore::new(config.data_dir.clone()));
    store.sweep_temp_files(DocumentKind::AreaInfo, None).await?;

    match command {
        Command::Rebuild => {
            let index = AreaIndex::new(store);
            let count = index.rebuild().await?;
            println!("indexed {count} areas");
        }
        Command::Search { term, limit } => {
            let index = AreaIndex::open(store).await?;
            let results = match limit {
                Some(limit) => index.search_limited(&term, limit),
                None => index.search(&term),
            };
            for entry in results {
                println!("{}\t{}\t{}", entry.id, entry.name, entry.description);
            }
        }
        Command::Lookup { name } => {
            let index = AreaIndex::open(store).await?;
            match index.find_by_normalized_name(&normalize_name_key(&name)) {
                Some(id) => println!("{id}"),
                None => println!("no area named {name:?}"),
            }
        }
        Command::Show { id } => {
            let document = store
                .read(&DocumentKey::new(DocumentKind::AreaInfo, id))
                .await?;
            println!("{}", serde_json::to_string_pretty(&document).unwrap_or_default());
        }
        Command::Create {
            name,
            description,
            id,
        } => {
            let index = AreaIndex::open(store.clone()).await?;
            let draft = AreaDraft {
                id,
                name,
                description,
            };
            let id = create_area(store.as_ref(), &index, draft).await?;
            println!("{id}");
        }
        Command::Status => {
            let index = AreaIndex::open(store).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&index.status()).unwrap_or_default()
            );
        }
        Command::Watch => {
            if !config.watch {
                tracing::warn!("watching is disabled by configuration");
                return Ok(());
            }
            let index = AreaIndex::open(store.clone()).await?;
            let dir = store.namespace_dir(DocumentKind::AreaInfo, None)?;
            let _watcher = AreaIndexWatcher::start(index.clone(), dir, config.debounce).await?;
            println!("watching {} areas, press Ctrl+C to stop", index.len());
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl+C: {error}");
            }
            println!("stopped");
        }
    }
    Ok(())
}
