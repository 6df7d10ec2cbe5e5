//! Error types shared by the capture pipeline and the masking engine.

use thiserror::Error;
use tower::BoxError;

/// Failure to buffer a message body.
///
/// These are the only faults that leave the pipeline: an exchange whose
/// body cannot be read is unusable, so the error reaches the host.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] BoxError),

    /// The body produced by the downstream service could not be read.
    #[error("failed to read response body: {0}")]
    ResponseBody(#[source] BoxError),
}

/// Failure to turn body bytes into text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The declared charset is not one the decoder knows.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
}

/// Failure to compile or apply a single JSON path expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The expression does not follow the path grammar.
    #[error("invalid path syntax at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// A definite path addressed a location that does not exist.
    #[error("no value at {0}")]
    NotFound(String),
}

impl PathError {
    pub(crate) fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        PathError::Syntax {
            offset,
            reason: reason.into(),
        }
    }
}
