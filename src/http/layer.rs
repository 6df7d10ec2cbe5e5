//! Tower middleware running the capture-and-mask pipeline around a service.
//!
//! # Data Flow
//! ```text
//! Request<B>
//!     → capture body (single read)
//!     → log masked request record
//!     → inner service gets Request<Body> over the same bytes
//!     → capture response body
//!     → log masked response record
//!     → caller gets Response<Body> over the same bytes
//! ```
//!
//! # Design Decisions
//! - Errors are `BoxError`; only body read failures and inner service
//!   failures surface, logging faults never do
//! - A response record is always written: the captured response, or a
//!   bodiless record on inner error (500), unreadable body (502), panic (500)
//!   or cancellation (499)

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, HttpBody};
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::{BoxError, Layer, Service};

use crate::error::CaptureError;
use crate::http::capture::{CapturedRequest, CapturedResponse};
use crate::masking::MaskConfig;
use crate::pipeline::{panic_message, ExchangeLogger, RecordSink};

/// Layer adding [`CaptureService`] around a service.
#[derive(Clone, Debug)]
pub struct CaptureLayer {
    logger: ExchangeLogger,
}

impl CaptureLayer {
    pub fn new(config: Arc<MaskConfig>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            logger: ExchangeLogger::new(config, sink),
        }
    }

    /// Layer logging through `tracing`.
    pub fn with_tracing(config: Arc<MaskConfig>) -> Self {
        Self {
            logger: ExchangeLogger::with_tracing(config),
        }
    }
}

impl<S> Layer<S> for CaptureLayer {
    type Service = CaptureService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CaptureService {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Logs each exchange passing through it, masked per [`MaskConfig`].
#[derive(Clone, Debug)]
pub struct CaptureService<S> {
    inner: S,
    logger: ExchangeLogger,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CaptureService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ReqBody: HttpBody<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();

        Box::pin(async move {
            let captured = CapturedRequest::capture(req).await?;
            logger.log(&captured.view());
            let request = captured.into_request();

            // Armed until a response record is written.
            let pending = PendingResponse::new(logger.clone());

            // `call` itself runs inside the unwind boundary.
            let outcome = AssertUnwindSafe(async move {
                inner.call(request).await.map_err(Into::<BoxError>::into)
            })
            .catch_unwind()
            .await;

            match outcome {
                Ok(Ok(response)) => match CapturedResponse::capture(response).await {
                    Ok(captured) => {
                        pending.disarm();
                        logger.log(&captured.view());
                        Ok(captured.into_response())
                    }
                    Err(e) => {
                        pending.fail(StatusCode::BAD_GATEWAY);
                        Err(BoxError::from(e))
                    }
                },
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Downstream service failed before producing a response");
                    pending.fail(StatusCode::INTERNAL_SERVER_ERROR);
                    Err(e)
                }
                Err(panic) => {
                    tracing::error!(
                        panic = panic_message(&panic),
                        "Downstream service panicked before producing a response"
                    );
                    pending.fail(StatusCode::INTERNAL_SERVER_ERROR);
                    std::panic::resume_unwind(panic)
                }
            }
        })
    }
}

/// Writes a response record for an exchange that never produced a
/// response. Dropping it while armed means the exchange was cancelled.
struct PendingResponse {
    logger: Option<ExchangeLogger>,
}

impl PendingResponse {
    fn new(logger: ExchangeLogger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    fn disarm(mut self) {
        self.logger = None;
    }

    fn fail(mut self, status: StatusCode) {
        if let Some(logger) = self.logger.take() {
            logger.log_failure(status.as_u16());
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if let Some(logger) = self.logger.take() {
            tracing::warn!("Exchange cancelled before a response was produced");
            logger.log_failure(CANCELLED_STATUS);
        }
    }
}

/// Status logged for an exchange abandoned by its caller.
pub const CANCELLED_STATUS: u16 = 499;

/// Map a [`CaptureService`] error to a response, for use with
/// `axum::error_handling::HandleErrorLayer`.
pub async fn handle_capture_error(err: BoxError) -> Response<Body> {
    let status = match err.downcast_ref::<CaptureError>() {
        Some(CaptureError::RequestBody(_)) => StatusCode::BAD_REQUEST,
        Some(CaptureError::ResponseBody(_)) => StatusCode::BAD_GATEWAY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(status = %status, error = %err, "Exchange could not be processed");
    (status, status.canonical_reason().unwrap_or("Error").to_string()).into_response()
}
