// HTTP API for the artifact dashboard
// Exposes collect / persist / query-catalog operations as JSON endpoints

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
