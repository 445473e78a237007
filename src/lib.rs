//! # screenserve - embedded MJPEG screen-streaming server
//!
//! screenserve is the HTTP side of a device screen-mirroring application:
//! a single-instance server that exposes a live MJPEG stream plus a small
//! set of generated pages (index, PIN entry, favicon/logo), optionally
//! gated behind a numeric PIN.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Owning application                           │
//! │        (capture pipeline, settings UI, error presentation)          │
//! └─────────────────────────────────────────────────────────────────────┘
//!         │ configure / start / stop / destroy          ▲ errors
//!         ▼                                             │
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Lifecycle actor                              │
//! │   one task, one mutable state record, events applied in order       │
//! │  ┌───────────────┐   ┌────────────────┐   ┌────────────────────┐   │
//! │  │ Template      │   │ ServerState    │   │ ListenerController │   │
//! │  │ derivation    │──▶│ (phase, pages, │──▶│ (hyper accept loop │   │
//! │  │ (pure)        │   │  listener)     │   │  + MJPEG handler)  │   │
//! │  └───────────────┘   └────────────────┘   └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use screenserve::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let frames = Arc::new(BroadcastFrameSource::new(8));
//!     let server = StreamServer::with_defaults(frames.clone(), Arc::new(LogReporter));
//!
//!     server.configure(StreamSettings::new().background_color(0x212121));
//!     server.start(BindAddress::any(8080));
//!
//!     // Feed `frames.publish(jpeg_bytes)` from the capture pipeline.
//!     // Later: server.stop(); server.destroy();
//! }
//! ```
//!
//! ## Lifecycle
//!
//! The server is driven by four fire-and-forget operations processed by a
//! single actor task, strictly in submission order:
//!
//! 1. **configure** derives the served pages and paths from settings
//! 2. **start** binds the listener and serves the derived content
//! 3. **stop** tears the listener down; configure/start again to resume
//! 4. **destroy** is terminal; the instance accepts nothing afterwards
//!
//! Failures surface through the [`error::ErrorReporter`] callback, each
//! tagged fixable (retry with different parameters) or fatal (destroy and
//! recreate the instance).

pub mod content;
pub mod error;
pub mod http;
pub mod server;
pub mod settings;
pub mod stats;

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::content::{AssetProvider, EmbeddedAssets, EnglishStrings, Localizer};
    pub use crate::error::{ErrorReporter, LogReporter, ServerError};
    pub use crate::http::{BroadcastFrameSource, FrameSource, HyperListener, ListenerController};
    pub use crate::server::{Phase, StreamServer};
    pub use crate::settings::{BindAddress, StreamSettings};
    pub use crate::stats::{LogStatistics, StatisticEvent, StatisticsSink};
}

// Re-export for convenience
pub use error::{ErrorReporter, ServerError};
pub use http::BroadcastFrameSource;
pub use server::{Phase, StreamServer};
pub use settings::{BindAddress, StreamSettings};
