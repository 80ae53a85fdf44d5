// HTTP request handlers for API endpoints

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpResponse, Result};

use crate::api::models::*;
use crate::database_ops::harvard::{collect, list_categories, CatalogSource, FetchLimits};
use crate::database_ops::queries::{QueryArgError, CATALOG};
use crate::database_ops::{ensure_schema, persist, run_query, CatalogQuery, Db};
use crate::error::PipelineError;
use crate::normalization::ProjectedBatch;

/// Shared handler state: the store, the catalog transport, and run bounds.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub source: Arc<dyn CatalogSource>,
    pub limits: FetchLimits,
    pub min_object_count: i64,
    pub started: Instant,
}

fn pipeline_error(err: PipelineError) -> HttpResponse {
    tracing::warn!(error = %err, "request failed");
    let body = ApiResponse::<()>::error(err.to_string());
    match err {
        PipelineError::SourceUnavailable { .. } => HttpResponse::BadGateway().json(body),
        PipelineError::MalformedRecord { .. } => HttpResponse::UnprocessableEntity().json(body),
        PipelineError::ReferentialViolation { .. } => HttpResponse::Conflict().json(body),
        PipelineError::SchemaConflict { .. } | PipelineError::Store(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn argument_error(err: QueryArgError) -> HttpResponse {
    let body = ApiResponse::<()>::error(err.to_string());
    match err {
        QueryArgError::UnknownQuery(_) => HttpResponse::NotFound().json(body),
        QueryArgError::MissingObjectId(_) => HttpResponse::BadRequest().json(body),
    }
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let db_status = if state.db.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Classifications large enough to offer for collection
pub async fn get_categories(
    query: web::Query<CategoriesQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let min_count = query.min_count.unwrap_or(state.min_object_count);
    match list_categories(state.source.as_ref(), min_count).await {
        Ok(categories) => Ok(HttpResponse::Ok().json(ApiResponse::success(CategoriesResponse {
            min_count,
            categories,
        }))),
        Err(e) => Ok(pipeline_error(e)),
    }
}

/// Fetch and project one category; nothing is written.
pub async fn collect_category(
    payload: web::Json<CollectRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let category = payload.into_inner().category;
    if category.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error("category is required")));
    }

    tracing::info!(category = %category, "Collect requested");

    match collect(state.source.as_ref(), &category, state.limits).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(ApiResponse::success(CollectResponse {
            category,
            counts: batch.counts(),
            batch,
        }))),
        Err(e) => Ok(pipeline_error(e)),
    }
}

/// Write a previously collected batch.
pub async fn persist_batch(
    payload: web::Json<ProjectedBatch>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let batch = payload.into_inner();
    let counts = batch.counts();

    tracing::info!(
        metadata = counts.metadata,
        media = counts.media,
        colors = counts.colors,
        "Persist requested"
    );

    match persist(&state.db, &batch).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(PersistResponse {
            counts,
            summary,
        }))),
        Err(e) => Ok(pipeline_error(e)),
    }
}

/// Catalog listing
pub async fn list_queries() -> Result<HttpResponse> {
    let entries: Vec<QueryInfo> = CATALOG.iter().map(QueryInfo::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(entries)))
}

/// Run one catalog entry by number
pub async fn run_catalog_query(
    path: web::Path<u8>,
    args: web::Query<QueryArgs>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let number = path.into_inner();
    let query = match CatalogQuery::from_number(number, args.object_id) {
        Ok(q) => q,
        Err(e) => return Ok(argument_error(e)),
    };

    if let Err(e) = ensure_schema(&state.db).await {
        return Ok(pipeline_error(e));
    }

    match run_query(&state.db, &query).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(pipeline_error(e)),
    }
}
