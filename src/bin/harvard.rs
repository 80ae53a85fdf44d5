use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harvard_artifacts::api::ApiServer;
use harvard_artifacts::cli::collect::{provider_from_env, run as run_collect, run_categories, CollectConfig};
use harvard_artifacts::cli::query::{list as list_queries, run as run_query, QueryConfig};
use harvard_artifacts::database_ops::harvard::{ingest_category, FetchLimits};
use harvard_artifacts::database_ops::Db;
use harvard_artifacts::logging::{init_tracing, DEFAULT_FILTER};
use harvard_artifacts::util::env;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "harvard", version, about = "Harvard Art Museums artifact pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// List classifications with enough objects to collect
    Categories {
        /// Override HARVARD_MIN_OBJECT_COUNT (default 2500)
        #[arg(long)]
        min_count: Option<i64>,
    },
    /// Fetch and project one classification, printing counts and previews
    Collect {
        /// Classification name, e.g. "Paintings"
        category: String,
        /// Rows shown per preview table
        #[arg(long, default_value_t = 5)]
        preview: usize,
        /// Also write the batch to the store
        #[arg(long, default_value_t = false)]
        persist: bool,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Override HARVARD_PAGE_SIZE
        #[arg(long)]
        page_size: Option<u32>,
        /// Override HARVARD_MAX_PAGES
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Collect and persist one classification in a single step
    Ingest {
        category: String,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Print the query catalog
    Queries,
    /// Run one catalog query by number
    Query {
        /// Catalog entry number (1-25)
        number: u8,
        /// Object id for the "Colors for artifact ID" entry
        #[arg(long)]
        object_id: Option<i64>,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Run the HTTP API (same as the api_server binary)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    let _ = init_tracing(DEFAULT_FILTER);
    env::bootstrap_cli("harvard");

    let cli = Cli::parse();

    match cli.command {
        Commands::Categories { min_count } => run_categories(min_count).await?,
        Commands::Collect {
            category,
            preview,
            persist,
            db_url,
            page_size,
            max_pages,
        } => {
            let cfg = CollectConfig {
                category,
                preview_rows: preview,
                persist,
                database_url: db_url,
                page_size,
                max_pages,
            };
            run_collect(cfg).await?;
        }
        Commands::Ingest { category, db_url } => {
            let url = db_url.unwrap_or_else(env::db_url);
            let db = Db::connect(&url, env::env_parse("DB_MAX_CONNS", 5u32)).await?;
            let provider = provider_from_env()?;
            let summary = ingest_category(&db, &provider, &category, FetchLimits::from_env())
                .await
                .with_context(|| format!("ingest '{category}'"))?;
            info!(
                category = %summary.category,
                metadata = summary.collected.metadata,
                media = summary.collected.media,
                colors = summary.collected.colors,
                inserted_metadata = summary.persisted.metadata_inserted,
                inserted_media = summary.persisted.media_inserted,
                inserted_colors = summary.persisted.colors_inserted,
                "ingest: completed"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Queries => print!("{}", list_queries()),
        Commands::Serve => {
            let server = ApiServer::from_env()?;
            let db = Db::connect(&env::db_url(), env::env_parse("DB_MAX_CONNS", 5u32)).await?;
            server.run(db, Arc::new(provider_from_env()?)).await?;
        }
        Commands::Query {
            number,
            object_id,
            db_url,
        } => {
            run_query(QueryConfig {
                number,
                object_id,
                database_url: db_url,
            })
            .await?
        }
    }

    Ok(())
}
