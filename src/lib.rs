//! # Options Bridge - messaging channel and live localizer for options pages
//!
//! Provides:
//! - A duplex messaging channel to one peer context (fire-and-forget sends,
//!   request/response with correlation ids, event subscription)
//! - A localizer that keeps a mutating document translated once a dictionary
//!   has arrived over the channel
//! - The page runtime tying both to a single cooperative task queue
//! - The background-side host answering the page's requests
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────── Page ─────────────┐         ┌──── OptionsHost ────┐
//!   │ Document ◀── Localizer        │         │  i18n.cache         │
//!   │    │ records     ▲ dictionary │ frames  │  tab.get / tab.set  │
//!   │    ▼             │            │◀───────▶│  options.init       │
//!   │  task queue ◀── Channel ──────┼─────────┼── Channel           │
//!   └───────────────────────────────┘         └─────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod dom;
pub mod host;
pub mod i18n;
pub mod page;
pub mod protocol;
pub mod transport;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
