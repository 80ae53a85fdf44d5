use thiserror::Error;

/// Failure conditions surfaced by the ingestion pipeline and the query catalog.
///
/// Nothing in the core retries or swallows these; callers decide whether to re-invoke.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network failure, non-success status, or an undecodable payload from the catalog API.
    #[error("catalog source unavailable ({endpoint}): {reason}")]
    SourceUnavailable { endpoint: String, reason: String },

    /// A raw record lacks one of its identifying fields.
    #[error("malformed record at index {index}: missing required field '{field}'")]
    MalformedRecord { field: &'static str, index: usize },

    /// A media or color row referenced a parent row that does not exist.
    #[error("referential violation while writing {table}: {reason}")]
    ReferentialViolation { table: &'static str, reason: String },

    /// A pre-existing table does not match the expected definition.
    #[error("schema conflict on {table}: missing columns {missing:?}")]
    SchemaConflict { table: &'static str, missing: Vec<String> },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl PipelineError {
    pub(crate) fn unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a write failure for `table`, promoting foreign-key failures to `ReferentialViolation`.
    pub(crate) fn from_write(table: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::ReferentialViolation {
                    table,
                    reason: db_err.message().to_string(),
                }
            }
            _ => Self::Store(err),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
