pub mod db;
pub mod harvard;
pub mod persist;
pub mod queries;
pub mod schema;

pub use db::Db;
pub use persist::{persist, PersistSummary};
pub use queries::{run_query, CatalogQuery, QueryKey, QueryResult};
pub use schema::ensure_schema;
