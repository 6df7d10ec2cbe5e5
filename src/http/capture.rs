//! Body capture for requests and responses.
//!
//! # Responsibilities
//! - Read a body exactly once into a single buffer
//! - Hand out a loggable view over that buffer
//! - Rebuild the message over the same bytes for its real consumer
//!
//! # Design Decisions
//! - One `Bytes` buffer per message; the replayed body is a refcounted
//!   clone, never a copy
//! - Head parts (status, version, headers, extensions) travel untouched
//! - Read errors propagate; capture never hides I/O faults

use axum::body::{Body, HttpBody};
use axum::http::{request, response, Request, Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::BoxError;

use crate::error::CaptureError;
use crate::http::view::HttpMessageView;

/// A request whose body has been buffered.
#[derive(Debug)]
pub struct CapturedRequest {
    parts: request::Parts,
    body: Bytes,
}

impl CapturedRequest {
    /// Read the whole body of `req`.
    pub async fn capture<B>(req: Request<B>) -> Result<Self, CaptureError>
    where
        B: HttpBody<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| CaptureError::RequestBody(e.into()))?
            .to_bytes();
        Ok(Self { parts, body })
    }

    pub fn parts(&self) -> &request::Parts {
        &self.parts
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn view(&self) -> HttpMessageView {
        HttpMessageView::from_request_parts(&self.parts, self.body.clone())
    }

    /// A fresh request over the captured bytes, for the next stage.
    pub fn into_request(self) -> Request<Body> {
        Request::from_parts(self.parts, Body::from(self.body))
    }
}

/// A response whose body has been buffered.
#[derive(Debug)]
pub struct CapturedResponse {
    parts: response::Parts,
    body: Bytes,
}

impl CapturedResponse {
    /// Read everything the downstream service wrote.
    pub async fn capture<B>(res: Response<B>) -> Result<Self, CaptureError>
    where
        B: HttpBody<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = res.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| CaptureError::ResponseBody(e.into()))?
            .to_bytes();
        Ok(Self { parts, body })
    }

    pub fn parts(&self) -> &response::Parts {
        &self.parts
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn view(&self) -> HttpMessageView {
        HttpMessageView::from_response_parts(&self.parts, self.body.clone())
    }

    /// The response to deliver to the caller, byte-identical to what was
    /// captured.
    pub fn into_response(self) -> Response<Body> {
        Response::from_parts(self.parts, Body::from(self.body))
    }
}
