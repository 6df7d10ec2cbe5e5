//! Loggable view of a captured message.
//!
//! # Responsibilities
//! - Extract method/URL or status, headers, content type and charset
//! - Decode body bytes to text under the declared charset
//!
//! # Design Decisions
//! - Charset defaults to UTF-8 when the content type names none
//! - The request URL excludes the query string
//! - Invalid byte sequences decode lossily; only an unknown charset label is an error

use std::fmt;

use axum::http::{header, request, response, HeaderMap, Uri};
use bytes::Bytes;
use encoding_rs::Encoding;
use serde::Serialize;

use crate::error::DecodeError;
use crate::masking::{Direction, HeaderList};

pub const DEFAULT_CHARSET: &str = "UTF-8";

/// The first line of a logged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageLine {
    Request { method: String, url: String },
    Response { status: u16 },
}

impl MessageLine {
    pub fn direction(&self) -> Direction {
        match self {
            MessageLine::Request { .. } => Direction::Request,
            MessageLine::Response { .. } => Direction::Response,
        }
    }
}

impl fmt::Display for MessageLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLine::Request { method, url } => write!(f, "{} {}", method, url),
            MessageLine::Response { status } => write!(f, "{}", status),
        }
    }
}

/// Everything the pipeline logs about one side of an exchange.
#[derive(Debug, Clone)]
pub struct HttpMessageView {
    pub line: MessageLine,
    pub headers: HeaderList,
    pub content_type: Option<String>,
    pub charset: String,
    pub body: Bytes,
}

impl HttpMessageView {
    pub fn from_request_parts(parts: &request::Parts, body: Bytes) -> Self {
        let line = MessageLine::Request {
            method: parts.method.to_string(),
            url: request_url(&parts.uri, &parts.headers),
        };
        Self::build(line, &parts.headers, body)
    }

    pub fn from_response_parts(parts: &response::Parts, body: Bytes) -> Self {
        let line = MessageLine::Response {
            status: parts.status.as_u16(),
        };
        Self::build(line, &parts.headers, body)
    }

    /// A response that was never produced: bare status, no headers, no body.
    pub fn failed_response(status: u16) -> Self {
        Self {
            line: MessageLine::Response { status },
            headers: HeaderList::new(),
            content_type: None,
            charset: DEFAULT_CHARSET.to_string(),
            body: Bytes::new(),
        }
    }

    fn build(line: MessageLine, headers: &HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let charset = content_type
            .as_deref()
            .and_then(charset_param)
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());

        Self {
            line,
            headers: HeaderList::from(headers),
            content_type,
            charset,
            body,
        }
    }

    pub fn direction(&self) -> Direction {
        self.line.direction()
    }

    /// True when the content type declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_json)
    }

    /// Decode the body under the message charset.
    pub fn decode_body(&self) -> Result<String, DecodeError> {
        decode(&self.body, &self.charset)
    }
}

/// Case-insensitive `application/json` check on a content type.
pub fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

/// The `charset` parameter of a content type, unquoted.
pub fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Decode `bytes` under the named charset (any WHATWG encoding label).
///
/// Malformed sequences become U+FFFD; a byte order mark overrides the label.
pub fn decode(bytes: &[u8], charset: &str) -> Result<String, DecodeError> {
    let encoding = Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| DecodeError::UnsupportedCharset(charset.to_string()))?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// `scheme://authority/path`, falling back to the `Host` header when the
/// request target carries no authority.
fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = uri.scheme_str().unwrap_or("http");
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        });

    match authority {
        Some(authority) => format!("{}://{}{}", scheme, authority, uri.path()),
        None => uri.path().to_string(),
    }
}
