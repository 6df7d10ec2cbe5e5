//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → layer.rs (capture, log masked request)
//!     → capture.rs (single body read, replay)
//!     → server.rs proxy handler (forward to upstream)
//!     → layer.rs (capture, log masked response)
//!     → Send to client, bytes unchanged
//! ```

pub mod capture;
pub mod layer;
pub mod server;
pub mod view;

pub use capture::{CapturedRequest, CapturedResponse};
pub use layer::{handle_capture_error, CaptureLayer, CaptureService};
pub use server::HttpServer;
pub use view::{HttpMessageView, MessageLine};
