//! Configuration types and defaults

use crate::error::{RecmuxError, RecmuxResult};
use recmux_media::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Default control server port
pub const DEFAULT_CONTROL_PORT: u16 = 7070;

/// Global recmux configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Address the control server binds to
    pub control_bind_addr: SocketAddr,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Write buffer for recordings that do not request one
    pub default_buffer_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            control_bind_addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), DEFAULT_CONTROL_PORT),
            log_filter: "info".to_string(),
            default_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl GlobalConfig {
    /// Load from JSON; omitted fields keep their defaults
    pub fn from_json_str(json: &str) -> RecmuxResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| RecmuxError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> RecmuxResult<()> {
        if self.default_buffer_size == 0 {
            return Err(RecmuxError::Config {
                reason: "default_buffer_size must be greater than 0".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(RecmuxError::Config {
                reason: "log_filter is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.control_bind_addr.port(), DEFAULT_CONTROL_PORT);
        assert_eq!(config.default_buffer_size, 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            GlobalConfig::from_json_str(r#"{"log_filter": "recmux_media=debug"}"#).unwrap();
        assert_eq!(config.log_filter, "recmux_media=debug");
        assert_eq!(config.control_bind_addr, GlobalConfig::default().control_bind_addr);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = GlobalConfig::from_json_str(r#"{"control_bind_addr": "nowhere"}"#).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        let err = GlobalConfig::from_json_str(r#"{"default_buffer_size": 0}"#).unwrap_err();
        assert!(err.to_string().contains("default_buffer_size"));
    }
}
