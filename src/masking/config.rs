//! The set of masking rules applied to every exchange.

use crate::masking::path::PathRule;
use crate::masking::predicate::MaskPredicate;

/// Which side of an exchange a rule set applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Masking rules for requests and responses.
///
/// Built once with the `mask_*` methods, then shared read-only (usually in
/// an `Arc`) by every exchange. Predicates start as never-match and grow by
/// OR; path lists start empty and grow by append.
#[derive(Debug, Clone, Default)]
pub struct MaskConfig {
    request_headers: MaskPredicate,
    response_headers: MaskPredicate,
    request_body_fields: MaskPredicate,
    response_body_fields: MaskPredicate,
    request_body_paths: Vec<PathRule>,
    response_body_paths: Vec<PathRule>,
}

/// Borrowed view of the rules for one direction.
#[derive(Debug, Clone, Copy)]
pub struct DirectionRules<'a> {
    pub headers: &'a MaskPredicate,
    pub body_fields: &'a MaskPredicate,
    pub body_paths: &'a [PathRule],
}

impl MaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mask_request_headers(mut self, predicate: MaskPredicate) -> Self {
        self.request_headers = self.request_headers.or(predicate);
        self
    }

    #[must_use]
    pub fn mask_response_headers(mut self, predicate: MaskPredicate) -> Self {
        self.response_headers = self.response_headers.or(predicate);
        self
    }

    #[must_use]
    pub fn mask_request_body_fields(mut self, predicate: MaskPredicate) -> Self {
        self.request_body_fields = self.request_body_fields.or(predicate);
        self
    }

    #[must_use]
    pub fn mask_response_body_fields(mut self, predicate: MaskPredicate) -> Self {
        self.response_body_fields = self.response_body_fields.or(predicate);
        self
    }

    #[must_use]
    pub fn mask_request_body_json_path(mut self, path: impl Into<String>) -> Self {
        self.request_body_paths.push(PathRule::new(path));
        self
    }

    #[must_use]
    pub fn mask_response_body_json_path(mut self, path: impl Into<String>) -> Self {
        self.response_body_paths.push(PathRule::new(path));
        self
    }

    pub fn request_headers(&self) -> &MaskPredicate {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &MaskPredicate {
        &self.response_headers
    }

    pub fn request_body_fields(&self) -> &MaskPredicate {
        &self.request_body_fields
    }

    pub fn response_body_fields(&self) -> &MaskPredicate {
        &self.response_body_fields
    }

    pub fn request_body_paths(&self) -> &[PathRule] {
        &self.request_body_paths
    }

    pub fn response_body_paths(&self) -> &[PathRule] {
        &self.response_body_paths
    }

    /// Rules for one side of the exchange.
    pub fn rules(&self, direction: Direction) -> DirectionRules<'_> {
        match direction {
            Direction::Request => DirectionRules {
                headers: &self.request_headers,
                body_fields: &self.request_body_fields,
                body_paths: &self.request_body_paths,
            },
            Direction::Response => DirectionRules {
                headers: &self.response_headers,
                body_fields: &self.response_body_fields,
                body_paths: &self.response_body_paths,
            },
        }
    }
}
