//! Console logging setup.

use crate::error::LoggingError;
use tracing_subscriber::EnvFilter;

/// Initialize console logging with the given filter directives, falling
/// back to the `RUST_LOG` environment variable and then to `info`.
pub fn init_logging(directives: Option<&str>) -> Result<(), LoggingError> {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
