//! Per-direction logging pipeline: view → mask → record → sink.
//!
//! Every step that touches masking rules or body decoding runs behind its
//! own failure boundary. A failing step is reported and its input is used
//! unchanged, so a record is always produced and nothing propagates.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use crate::http::view::{HttpMessageView, MessageLine};
use crate::masking::{mask_json, Direction, HeaderList, MaskConfig};

/// Tracing target for exchange records.
pub const LOG_TARGET: &str = "masking_proxy::exchange";

/// What gets logged for one side of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub line: MessageLine,
    pub headers: HeaderList,
    pub body: String,
}

impl LogRecord {
    pub fn direction(&self) -> Direction {
        self.line.direction()
    }
}

/// Destination for log records.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

/// Emits each record as three `tracing` events at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        match &record.line {
            MessageLine::Request { method, url } => {
                tracing::info!(target: LOG_TARGET, "Received Request: {} {}", method, url);
                tracing::info!(target: LOG_TARGET, "Request Headers: {}", record.headers);
                tracing::info!(target: LOG_TARGET, "Request Body: {}", record.body);
            }
            MessageLine::Response { status } => {
                tracing::info!(target: LOG_TARGET, "Response Status: {}", status);
                tracing::info!(target: LOG_TARGET, "Response Headers: {}", record.headers);
                tracing::info!(target: LOG_TARGET, "Response Body: {}", record.body);
            }
        }
    }
}

/// Builds masked records from message views and hands them to a sink.
#[derive(Clone)]
pub struct ExchangeLogger {
    config: Arc<MaskConfig>,
    sink: Arc<dyn RecordSink>,
}

impl ExchangeLogger {
    pub fn new(config: Arc<MaskConfig>, sink: Arc<dyn RecordSink>) -> Self {
        Self { config, sink }
    }

    /// Logger writing to [`TracingSink`].
    pub fn with_tracing(config: Arc<MaskConfig>) -> Self {
        Self::new(config, Arc::new(TracingSink))
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Mask `view` and emit the record. Never fails.
    pub fn log(&self, view: &HttpMessageView) {
        let record = self.record(view);
        let direction = record.direction();
        guarded(
            direction,
            "emit",
            || (),
            || self.sink.emit(&record),
        );
    }

    /// Emit the response record for an exchange that produced no response.
    pub fn log_failure(&self, status: u16) {
        self.log(&HttpMessageView::failed_response(status));
    }

    /// Build the masked record for `view`.
    pub fn record(&self, view: &HttpMessageView) -> LogRecord {
        let direction = view.direction();
        let rules = self.config.rules(direction);

        let headers = guarded(
            direction,
            "mask headers",
            || view.headers.clone(),
            || view.headers.masked(rules.headers),
        );

        let text = guarded(direction, "decode body", || lossy(view), || decode(view));

        let body = if view.is_json() {
            guarded(
                direction,
                "mask body",
                || text.clone(),
                || match mask_json(&text, rules.body_fields, rules.body_paths) {
                    Ok(masked) => masked,
                    Err(e) => {
                        tracing::warn!(
                            direction = %direction,
                            error = %e,
                            "Failed to parse body as JSON"
                        );
                        text.clone()
                    }
                },
            )
        } else {
            text
        };

        LogRecord {
            line: view.line.clone(),
            headers,
            body,
        }
    }
}

impl std::fmt::Debug for ExchangeLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeLogger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn decode(view: &HttpMessageView) -> String {
    match view.decode_body() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(
                direction = %view.direction(),
                error = %e,
                "Failed to decode body, falling back to lossy UTF-8"
            );
            lossy(view)
        }
    }
}

fn lossy(view: &HttpMessageView) -> String {
    String::from_utf8_lossy(&view.body).into_owned()
}

/// Run `step`; on panic, report it and return `fallback()` instead.
fn guarded<T>(
    direction: Direction,
    step: &'static str,
    fallback: impl FnOnce() -> T,
    step_fn: impl FnOnce() -> T,
) -> T {
    match catch_unwind(AssertUnwindSafe(step_fn)) {
        Ok(value) => value,
        Err(panic) => {
            tracing::error!(
                direction = %direction,
                step,
                panic = panic_message(&panic),
                "Logging step failed, using unmasked value"
            );
            fallback()
        }
    }
}

pub(crate) fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
