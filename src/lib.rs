pub mod api;
pub mod cli;
pub mod database_ops;
pub mod error;
pub mod logging;
pub mod normalization;

pub mod util {
    pub mod env;
}

pub use error::{PipelineError, PipelineResult};
