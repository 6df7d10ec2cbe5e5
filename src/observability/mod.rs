//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → exchange records under the `masking_proxy::exchange` target
//!
//! Consumers:
//!     → stdout, pretty for development or JSON for aggregation
//! ```

pub mod logging;

pub use logging::init_logging;
