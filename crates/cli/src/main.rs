//! Demonstration binary wiring the indexing and search library crates
//! together end to end. The command-line front end itself is out of scope
//! (spec.md §1) — this exists only so the workspace has a runnable entry
//! point and an integration-test harness, not as a feature surface.

use context_cli::pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use context_indexer::{DirectorySynchronizer, IndexStats};
use context_protocol::Config;
use context_search::{SearchRequest, SearchType};

#[derive(Parser)]
#[command(name = "context", about = "Local code-and-document search engine")]
struct Cli {
    /// Path to a TOML config file; defaults applied for anything missing.
    #[arg(long, global = true, default_value = "context.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the index against a directory's current contents.
    Sync {
        /// Directory to sync; defaults to the config's `root`.
        root: Option<PathBuf>,
        #[arg(long)]
        force_rebuild: bool,
        #[arg(long, default_value_t = false)]
        no_recursive: bool,
        #[arg(long, default_value_t = 64)]
        batch_size: usize,
    },
    /// Run a filename, content, or hybrid search.
    Search {
        query: String,
        #[arg(long, value_enum, default_value = "hybrid")]
        r#type: CliSearchType,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        size: usize,
    },
    /// Print index statistics (chunk count, db path, last indexed time).
    Stats,
}

#[derive(Clone, clap::ValueEnum)]
enum CliSearchType {
    Filename,
    Content,
    Hybrid,
}

impl From<CliSearchType> for SearchType {
    fn from(value: CliSearchType) -> Self {
        match value {
            CliSearchType::Filename => SearchType::Filename,
            CliSearchType::Content => SearchType::Content,
            CliSearchType::Hybrid => SearchType::Hybrid,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Command::Sync {
            root,
            force_rebuild,
            no_recursive,
            batch_size,
        } => {
            if let Some(root) = root {
                config.root = root;
            }
            run_sync(&config, !no_recursive, force_rebuild, batch_size).await
        }
        Command::Search { query, r#type, page, size } => run_search(&config, query, r#type.into(), page, size).await,
        Command::Stats => run_stats(&config).await,
    }
}

async fn run_sync(config: &Config, recursive: bool, force_rebuild: bool, batch_size: usize) -> anyhow::Result<()> {
    let extraction_router = pipeline::extraction_router(config);
    let chunk_router = pipeline::chunk_router(config);
    let embedder = pipeline::embedding_provider(config);
    let store = pipeline::vector_store(config)?;
    let indexer = pipeline::semantic_indexer(config, extraction_router.clone(), chunk_router, embedder, store.clone());

    let sync = DirectorySynchronizer::new(extraction_router, store, indexer);
    let progress = |processed: usize, total: usize, message: &str| {
        println!("[{processed}/{total}] {message}");
    };

    let report = sync
        .sync(
            &config.root,
            recursive,
            &config.allowed_list,
            &config.block_list,
            batch_size,
            force_rebuild,
            Some(&progress),
            None,
        )
        .await?;

    println!(
        "sync complete: {} indexed, {} deleted, {} failed",
        report.indexed.len(),
        report.deleted.len(),
        report.failures.len()
    );
    for (doc_id, error) in &report.failures {
        eprintln!("  failed {doc_id}: {error}");
    }
    Ok(())
}

async fn run_search(config: &Config, query: String, search_type: SearchType, page: usize, size: usize) -> anyhow::Result<()> {
    let extraction_router = pipeline::extraction_router(config);
    let chunk_router = pipeline::chunk_router(config);
    let embedder = pipeline::embedding_provider(config);
    let store = pipeline::vector_store(config)?;
    let indexer = pipeline::semantic_indexer(config, extraction_router.clone(), chunk_router, embedder, store.clone());

    let mut request = SearchRequest::new(query, search_type);
    request.page = page;
    request.size = size;

    let response = match request.search_type {
        SearchType::Hybrid => pipeline::hybrid_planner(config, indexer, extraction_router, store)
            .search(&request)
            .await,
        SearchType::Content => {
            let hits = indexer.search(&request.query, size, None).await?;
            let (total, page_results) = context_search::paginate(
                hits.into_iter()
                    .map(|(entry, score)| {
                        let path = entry.metadata.get("path").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                        let mut result = context_search::SearchResult::new(path, score);
                        result.snippet = Some(entry.page_content.chars().take(280).collect());
                        result
                    })
                    .collect(),
                page,
                size,
            );
            context_search::SearchResponse {
                query: request.query.clone(),
                page,
                size,
                total,
                search_type: SearchType::Content,
                results: page_results,
            }
        }
        SearchType::Filename => {
            let filename = context_search::FilenameSearch::new(
                Box::new(context_search::MdfindTool),
                config.root.clone(),
                config.allowed_list.clone(),
                config.block_list.clone(),
            );
            filename.search(&request).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_stats(config: &Config) -> anyhow::Result<()> {
    let store = pipeline::vector_store(config)?;
    let stats = IndexStats::collect(store.as_ref(), context_indexer::db_path_for(config)).await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
