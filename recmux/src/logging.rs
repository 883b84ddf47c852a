//! Logging initialisation

use crate::error::{RecmuxError, RecmuxResult};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` when a
/// subscriber was already installed, which leaves the existing one in place.
pub fn init_logging(default_filter: &str) -> RecmuxResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| RecmuxError::Logging {
            reason: format!("invalid filter {:?}: {}", default_filter, e),
        })?,
    };

    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => {
            tracing::debug!("Logging initialised");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}
