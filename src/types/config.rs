//! Configuration structures.
//!
//! Configuration is loaded from a JSON file; every section falls back to its
//! defaults when omitted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::Result;

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Messaging channel configuration.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Localizer directive configuration.
    #[serde(default)]
    pub localizer: LocalizerConfig,

    /// Framed stream transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

/// Messaging channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Name of the peer context the channel talks to.
    pub peer_name: String,

    /// Pending calls above this count are logged as a likely leak
    /// (requests are never timed out).
    pub pending_warn_threshold: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            peer_name: "top".to_string(),
            pending_warn_threshold: 64,
        }
    }
}

/// Localizer directive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Attribute naming the key whose value replaces the element text.
    pub content_attribute: String,

    /// Attribute holding `attr:key;attr:key` pairs.
    pub values_attribute: String,

    /// Prefix of an inline text marker (`__MSG_key__`).
    pub marker_prefix: String,

    /// Suffix of an inline text marker.
    pub marker_suffix: String,

    /// Maximum flush rounds per task before remaining records are deferred.
    pub max_flush_rounds: usize,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            content_attribute: "i18n-content".to_string(),
            values_attribute: "i18n-values".to_string(),
            marker_prefix: "__MSG_".to_string(),
            marker_suffix: "__".to_string(),
            max_flush_rounds: 8,
        }
    }
}

/// Framed stream transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Per-frame write timeout. A peer that cannot accept a frame within this
    /// window is treated as gone.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
