use tracing_subscriber::{fmt, EnvFilter};

use crate::util::env::env_flag;

/// Filter used by the binaries when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Output knobs read from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFormat {
    /// `LOG_SOURCE_LOCATION`: append file:line to every event.
    pub source_location: bool,
    /// `LOG_TARGETS`: print the module path of every event.
    pub targets: bool,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self {
            source_location: env_flag("LOG_SOURCE_LOCATION", false),
            targets: env_flag("LOG_TARGETS", false),
        }
    }
}

/// Install the global compact fmt subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let format = LogFormat::from_env();

    fmt()
        .with_env_filter(filter)
        .with_target(format.targets)
        .with_file(format.source_location)
        .with_line_number(format.source_location)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_terse_output() {
        std::env::remove_var("LOG_SOURCE_LOCATION");
        std::env::remove_var("LOG_TARGETS");
        assert_eq!(LogFormat::from_env(), LogFormat::default());
    }
}
