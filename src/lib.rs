//! HTTP exchange capture with masked logging.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ CaptureLayer ──▶ proxy handler ──▶ upstream
//!                          │
//!                          ├─ capture body once (http::capture)
//!                          ├─ build view (http::view)
//!                          ├─ mask headers / fields / paths (masking)
//!                          └─ emit record (pipeline)
//!     Client Response
//!     ◀────────────── CaptureLayer ◀── proxy handler ◀── upstream
//! ```
//!
//! Masking only ever touches the logged copy. The bytes the upstream and
//! the client see are the bytes that were sent.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod masking;
pub mod observability;
pub mod pipeline;

pub use config::schema::ProxyConfig;
pub use error::{CaptureError, DecodeError, PathError};
pub use http::{CaptureLayer, HttpServer};
pub use lifecycle::Shutdown;
pub use masking::{MaskConfig, MaskPredicate, SENTINEL};
pub use pipeline::{ExchangeLogger, LogRecord, RecordSink, TracingSink};
