// API server implementation using actix-web

use std::sync::Arc;
use std::time::Instant;

use crate::api::{auth, handlers::AppState, middleware, routes};
use crate::database_ops::harvard::{min_object_count_from_env, CatalogSource, FetchLimits};
use crate::database_ops::{ensure_schema, Db};
use crate::util::env as env_util;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub api_secret: String,
    pub allowed_origins: String,
    pub limits: FetchLimits,
    pub min_object_count: i64,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let host = env_util::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_util::env_opt("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;

        let api_secret =
            env_util::env_req("API_SECRET").context("API_SECRET environment variable is required")?;

        let allowed_origins = env_util::env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:8501".to_string());

        Ok(Self {
            host,
            port,
            api_secret,
            allowed_origins,
            limits: FetchLimits::from_env(),
            min_object_count: min_object_count_from_env(),
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db, source: Arc<dyn CatalogSource>) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        ensure_schema(&db).await.context("prepare artifact tables")?;

        tracing::info!(
            host = %self.host,
            port = %self.port,
            page_size = self.limits.page_size,
            max_pages = self.limits.max_pages,
            "Starting artifact API server"
        );

        let state = web::Data::new(AppState {
            db,
            source,
            limits: self.limits,
            min_object_count: self.min_object_count,
            started: Instant::now(),
        });
        let api_secret = self.api_secret.clone();
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);
            let auth = auth::Auth::new(api_secret.clone());

            App::new()
                .app_data(state.clone())
                .app_data(web::JsonConfig::default().limit(64 * 1024 * 1024))
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .wrap(auth)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
