// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // API v1 routes (all require authentication)
        .service(
            web::scope("/api/v1")
                // Ingestion
                .route("/categories", web::get().to(handlers::get_categories))
                .route("/collect", web::post().to(handlers::collect_category))
                .route("/persist", web::post().to(handlers::persist_batch))
                // Query catalog
                .route("/queries", web::get().to(handlers::list_queries))
                .route(
                    "/queries/{number}",
                    web::get().to(handlers::run_catalog_query),
                ),
        );
}
