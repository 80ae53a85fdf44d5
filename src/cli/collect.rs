use anyhow::{Context, Result};

use crate::cli::table::render_rows;
use crate::database_ops::harvard::{
    collect, list_categories, min_object_count_from_env, FetchLimits, HarvardOptions,
    HarvardProvider,
};
use crate::database_ops::{persist, Db};
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct CollectConfig {
    /// Classification to fetch (e.g. "Paintings").
    pub category: String,
    /// Rows shown per table preview (0 disables previews).
    pub preview_rows: usize,
    /// Write the projected batch after collecting.
    pub persist: bool,
    /// Optional override for the store connection string.
    pub database_url: Option<String>,
    /// Paging overrides; `None` falls back to env / defaults.
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
}

pub fn provider_from_env() -> Result<HarvardProvider> {
    let options = HarvardOptions::from_env();
    if options.api_key.is_none() {
        tracing::warn!("HARVARD_API_KEY not set; catalog requests will likely be rejected");
    }
    HarvardProvider::from_options(&options).context("build harvard provider")
}

/// Print category names above the object-count threshold.
pub async fn run_categories(min_count: Option<i64>) -> Result<()> {
    env_util::init_env();
    let provider = provider_from_env()?;
    let min_count = min_count.unwrap_or_else(min_object_count_from_env);
    let names = list_categories(&provider, min_count)
        .await
        .context("list categories")?;
    println!("Classifications with at least {min_count} objects:");
    for name in names {
        println!("  {name}");
    }
    Ok(())
}

/// Fetch + project one category, print counts and previews, optionally persist.
pub async fn run(cfg: CollectConfig) -> Result<()> {
    env_util::init_env();
    let provider = provider_from_env()?;
    let env_limits = FetchLimits::from_env();
    let limits = FetchLimits {
        page_size: cfg.page_size.unwrap_or(env_limits.page_size),
        max_pages: cfg.max_pages.unwrap_or(env_limits.max_pages),
    };

    println!(
        "Fetching up to {} objects for {}...",
        limits.cap(),
        cfg.category
    );
    let batch = collect(&provider, &cfg.category, limits)
        .await
        .with_context(|| format!("collect '{}'", cfg.category))?;
    let counts = batch.counts();
    println!(
        "Collected {} metadata, {} media, and {} color records for {}",
        counts.metadata, counts.media, counts.colors, cfg.category
    );

    if cfg.preview_rows > 0 {
        println!("\nArtifact Metadata");
        print!("{}", render_rows(&batch.metadata, cfg.preview_rows));
        println!("\nArtifact Media");
        print!("{}", render_rows(&batch.media, cfg.preview_rows));
        println!("\nArtifact Colors");
        print!("{}", render_rows(&batch.colors, cfg.preview_rows));
    }

    if cfg.persist {
        let url = cfg.database_url.unwrap_or_else(env_util::db_url);
        let db = Db::connect(&url, env_util::env_parse("DB_MAX_CONNS", 5u32)).await?;
        let summary = persist(&db, &batch).await.context("persist batch")?;
        println!(
            "Inserted {} metadata ({} already present), {} media ({} already present), {} colors.",
            summary.metadata_inserted,
            summary.metadata_skipped,
            summary.media_inserted,
            summary.media_skipped,
            summary.colors_inserted
        );
    }
    Ok(())
}
