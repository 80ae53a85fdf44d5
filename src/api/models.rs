// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database_ops::queries::{QueryDescriptor, QueryParam};
use crate::database_ops::PersistSummary;
use crate::normalization::{BatchCounts, ProjectedBatch};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    /// Overrides the server's minimum object count.
    pub min_count: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub min_count: i64,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectRequest {
    pub category: String,
}

/// A projected batch plus its row counts; the body can be sent back to `/persist` as `batch`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectResponse {
    pub category: String,
    pub counts: BatchCounts,
    pub batch: ProjectedBatch,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistResponse {
    pub counts: BatchCounts,
    pub summary: PersistSummary,
}

/// Catalog listing entry (the SQL text stays server-side).
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryInfo {
    pub number: u8,
    pub label: String,
    pub requires_object_id: bool,
}

impl From<&QueryDescriptor> for QueryInfo {
    fn from(d: &QueryDescriptor) -> Self {
        Self {
            number: d.number,
            label: d.label.to_string(),
            requires_object_id: d.params.contains(&QueryParam::ObjectId),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryArgs {
    pub object_id: Option<i64>,
}
