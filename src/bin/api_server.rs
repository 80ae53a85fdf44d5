// HTTP API server binary for the artifact dashboard

use std::sync::Arc;

use anyhow::Result;
use harvard_artifacts::api::ApiServer;
use harvard_artifacts::cli::collect::provider_from_env;
use harvard_artifacts::database_ops::Db;
use harvard_artifacts::logging::{init_tracing, DEFAULT_FILTER};
use harvard_artifacts::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing(DEFAULT_FILTER)?;
    env_util::bootstrap_cli("api_server");

    tracing::info!("Initializing artifact API server");

    // Load configuration from environment
    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url();
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 5u32);
    let db = Db::connect(&database_url, max_connections).await?;

    tracing::info!("Database connected successfully");

    let source = Arc::new(provider_from_env()?);
    server.run(db, source).await?;

    Ok(())
}
