//! Core types for the options bridge.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (CorrelationId, PeerName)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for channel, localizer and transport

mod config;
mod errors;
mod ids;

pub use config::{ChannelConfig, Config, LocalizerConfig, ObservabilityConfig, TransportConfig};
pub use errors::{Error, Result};
pub use ids::{CorrelationId, PeerName};
