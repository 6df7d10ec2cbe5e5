//! Deep body masking through JSON path expressions.
//!
//! # Grammar
//! ```text
//! path     := "$"? segment*
//! segment  := "." name | ".*" | "[" selector "]"
//!           | ".." name | "..*" | ".." "[" selector "]"
//! selector := integer | "*" | 'name' | "name"
//! ```
//! A path without a leading `$` is read as if it had one, so `token.value`
//! and `$.token.value` are the same expression.
//!
//! # Design Decisions
//! - Paths are compiled once, when added to the configuration
//! - A definite path that does not resolve is an error; the caller skips it
//! - A wildcard or descent that matches nothing is not an error
//! - Masking is idempotent, so overlapping paths are harmless

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::PathError;
use crate::masking::SENTINEL;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Field(String),
    Index(i64),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(Selector),
    Descendant(Selector),
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Compile a path expression.
    pub fn parse(source: &str) -> Result<Self, PathError> {
        let segments = Parser::new(source.trim()).parse()?;
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the path can address at most one location.
    pub fn is_definite(&self) -> bool {
        self.segments.iter().all(|s| {
            matches!(
                s,
                Segment::Child(Selector::Field(_)) | Segment::Child(Selector::Index(_))
            )
        })
    }

    /// Overwrite every location this path resolves to with the sentinel.
    ///
    /// Returns how many values were replaced. A definite path that resolves
    /// to nothing yields [`PathError::NotFound`].
    pub fn mask(&self, root: &mut Value) -> Result<usize, PathError> {
        let strict = self.is_definite();
        apply(root, &self.segments, strict)
            .ok_or_else(|| PathError::NotFound(self.source.clone()))
    }
}

impl FromStr for JsonPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonPath::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A configured path: the expression as given plus its compiled form.
///
/// Compilation failures are kept rather than rejected so that one bad
/// expression only costs its own masking step.
#[derive(Debug, Clone)]
pub struct PathRule {
    source: String,
    compiled: Result<JsonPath, PathError>,
}

impl PathRule {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = JsonPath::parse(&source);
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compiled(&self) -> Result<&JsonPath, &PathError> {
        self.compiled.as_ref()
    }

    /// Mask `root` at this path.
    pub fn apply(&self, root: &mut Value) -> Result<usize, PathError> {
        match &self.compiled {
            Ok(path) => path.mask(root),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Apply `rules` to `root` strictly in order.
///
/// A rule that fails is logged and skipped; the remaining rules still run.
/// Returns the total number of values replaced.
pub fn mask_paths(root: &mut Value, rules: &[PathRule]) -> usize {
    let mut masked = 0;
    for rule in rules {
        match rule.apply(root) {
            Ok(0) => {
                tracing::debug!(path = %rule.source(), "JSON path matched nothing");
            }
            Ok(n) => masked += n,
            Err(e) => {
                tracing::warn!(path = %rule.source(), error = %e, "Failed to apply JSON path");
            }
        }
    }
    masked
}

/// Walk `segments` from `node`. `None` means a strict walk missed.
fn apply(node: &mut Value, segments: &[Segment], strict: bool) -> Option<usize> {
    let Some((first, rest)) = segments.split_first() else {
        *node = Value::String(SENTINEL.to_string());
        return Some(1);
    };

    let miss = if strict { None } else { Some(0) };

    match first {
        Segment::Child(Selector::Field(name)) => match node {
            Value::Object(map) => match map.get_mut(name) {
                Some(child) => apply(child, rest, strict),
                None => miss,
            },
            _ => miss,
        },
        Segment::Child(Selector::Index(index)) => match node {
            Value::Array(items) => match resolve_index(*index, items.len()) {
                Some(i) => apply(&mut items[i], rest, strict),
                None => miss,
            },
            _ => miss,
        },
        Segment::Child(Selector::Wildcard) => Some(
            children(node)
                .map(|child| apply(child, rest, false).unwrap_or(0))
                .sum(),
        ),
        Segment::Descendant(selector) => Some(descend(node, selector, rest)),
    }
}

/// Match `selector` at `node` and at every node below it.
fn descend(node: &mut Value, selector: &Selector, rest: &[Segment]) -> usize {
    let mut total = 0;

    match selector {
        Selector::Field(name) => {
            if let Value::Object(map) = &mut *node {
                if let Some(child) = map.get_mut(name) {
                    total += apply(child, rest, false).unwrap_or(0);
                }
            }
        }
        Selector::Index(index) => {
            if let Value::Array(items) = &mut *node {
                if let Some(i) = resolve_index(*index, items.len()) {
                    total += apply(&mut items[i], rest, false).unwrap_or(0);
                }
            }
        }
        Selector::Wildcard => {
            total += children(node)
                .map(|child| apply(child, rest, false).unwrap_or(0))
                .sum::<usize>();
        }
    }

    total
        + children(node)
            .map(|child| descend(child, selector, rest))
            .sum::<usize>()
}

fn children(node: &mut Value) -> Box<dyn Iterator<Item = &mut Value> + '_> {
    match node {
        Value::Object(map) => Box::new(map.values_mut()),
        Value::Array(items) => Box::new(items.iter_mut()),
        _ => Box::new(std::iter::empty()),
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<Vec<Segment>, PathError> {
        if self.src.trim().is_empty() {
            return Err(PathError::syntax(0, "empty path"));
        }

        let mut segments = Vec::new();
        if !self.eat('$') && !matches!(self.peek(), Some('.') | Some('[')) {
            segments.push(Segment::Child(Selector::Field(self.name()?)));
        }

        while let Some(c) = self.peek() {
            let segment = match c {
                '.' if self.rest().starts_with("..") => {
                    self.pos += 2;
                    Segment::Descendant(self.dotted_or_bracket()?)
                }
                '.' => {
                    self.pos += 1;
                    if self.eat('*') {
                        Segment::Child(Selector::Wildcard)
                    } else {
                        Segment::Child(Selector::Field(self.name()?))
                    }
                }
                '[' => Segment::Child(self.bracket()?),
                other => {
                    return Err(PathError::syntax(
                        self.pos,
                        format!("unexpected character '{other}'"),
                    ))
                }
            };
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(PathError::syntax(self.pos, "path must select below the root"));
        }
        Ok(segments)
    }

    fn dotted_or_bracket(&mut self) -> Result<Selector, PathError> {
        match self.peek() {
            Some('[') => self.bracket(),
            Some('*') => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            _ => Ok(Selector::Field(self.name()?)),
        }
    }

    fn name(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        let len = self
            .rest()
            .find(['.', '[', ']'])
            .unwrap_or(self.rest().len());
        self.pos += len;
        let name = &self.src[start..self.pos];
        if name.is_empty() {
            return Err(PathError::syntax(start, "expected a field name"));
        }
        Ok(name.to_string())
    }

    fn bracket(&mut self) -> Result<Selector, PathError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_ws();

        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                Selector::Field(self.quoted(q, open)?)
            }
            Some(_) => Selector::Index(self.integer()?),
            None => return Err(PathError::syntax(open, "unterminated bracket")),
        };

        self.skip_ws();
        if !self.eat(']') {
            return Err(PathError::syntax(self.pos, "expected ']'"));
        }
        Ok(selector)
    }

    fn quoted(&mut self, quote: char, open: usize) -> Result<String, PathError> {
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        Err(PathError::syntax(open, "unterminated quoted name"))
    }

    fn integer(&mut self) -> Result<i64, PathError> {
        let start = self.pos;
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - sign);
        if digits == 0 {
            return Err(PathError::syntax(start, "expected an index, '*' or a quoted name"));
        }
        let text = &rest[..sign + digits];
        self.pos += text.len();
        text.parse()
            .map_err(|_| PathError::syntax(start, format!("index out of range: {text}")))
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mask(path: &str, mut doc: Value) -> (Result<usize, PathError>, Value) {
        let result = JsonPath::parse(path).and_then(|p| p.mask(&mut doc));
        (result, doc)
    }

    #[test]
    fn test_parse_forms() {
        let same = [
            "$.token.value",
            "token.value",
            "$['token']['value']",
            "$[\"token\"].value",
            "$.token[ 'value' ]",
        ];
        let expected = JsonPath::parse(same[0]).unwrap().segments;
        for p in same {
            assert_eq!(JsonPath::parse(p).unwrap().segments, expected, "{p}");
        }
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "$", "$.", "$[", "$['a'", "$[abc]", "$.a]", "$..", "$[1"] {
            assert!(
                matches!(JsonPath::parse(bad), Err(PathError::Syntax { .. })),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_definite() {
        assert!(JsonPath::parse("$.a[0].b").unwrap().is_definite());
        assert!(!JsonPath::parse("$.a[*].b").unwrap().is_definite());
        assert!(!JsonPath::parse("$..b").unwrap().is_definite());
    }

    #[test]
    fn test_nested_field() {
        let (r, doc) = mask("$.token.value", json!({"token": {"value": "abc", "ttl": 60}}));
        assert_eq!(r, Ok(1));
        assert_eq!(doc, json!({"token": {"value": SENTINEL, "ttl": 60}}));
    }

    #[test]
    fn test_whole_subtree() {
        let (r, doc) = mask("$.token", json!({"token": {"value": "abc"}, "id": 1}));
        assert_eq!(r, Ok(1));
        assert_eq!(doc, json!({"token": SENTINEL, "id": 1}));
    }

    #[test]
    fn test_array_index() {
        let doc = json!({"cards": [{"pan": "1"}, {"pan": "2"}]});
        let (r, masked) = mask("$.cards[1].pan", doc.clone());
        assert_eq!(r, Ok(1));
        assert_eq!(masked, json!({"cards": [{"pan": "1"}, {"pan": SENTINEL}]}));

        let (r, masked) = mask("$.cards[-2].pan", doc.clone());
        assert_eq!(r, Ok(1));
        assert_eq!(masked["cards"][0]["pan"], SENTINEL);

        let (r, masked) = mask("$.cards[5].pan", doc.clone());
        assert!(matches!(r, Err(PathError::NotFound(_))));
        assert_eq!(masked, doc);
    }

    #[test]
    fn test_wildcard() {
        let (r, doc) = mask(
            "$.cards[*].pan",
            json!({"cards": [{"pan": "1"}, {"pan": "2", "exp": "12/30"}, {"other": 0}]}),
        );
        assert_eq!(r, Ok(2));
        assert_eq!(
            doc,
            json!({"cards": [{"pan": SENTINEL}, {"pan": SENTINEL, "exp": "12/30"}, {"other": 0}]})
        );
    }

    #[test]
    fn test_deep_scan() {
        let (r, doc) = mask(
            "$..password",
            json!({"password": "a", "nested": {"list": [{"password": "b"}, {"x": {"password": "c"}}]}}),
        );
        assert_eq!(r, Ok(3));
        assert_eq!(doc["password"], SENTINEL);
        assert_eq!(doc["nested"]["list"][0]["password"], SENTINEL);
        assert_eq!(doc["nested"]["list"][1]["x"]["password"], SENTINEL);
    }

    #[test]
    fn test_indefinite_without_match_is_ok() {
        let doc = json!({"a": 1});
        let (r, masked) = mask("$..secret", doc.clone());
        assert_eq!(r, Ok(0));
        assert_eq!(masked, doc);
    }

    #[test]
    fn test_missing_field_errors_and_leaves_doc() {
        let doc = json!({"user": {"name": "a"}});
        for path in ["$.user.password", "$.missing.password", "$.user.name.first"] {
            let (r, masked) = mask(path, doc.clone());
            assert_eq!(r, Err(PathError::NotFound(path.to_string())));
            assert_eq!(masked, doc);
        }
    }

    #[test]
    fn test_mask_paths_skips_bad_rules() {
        let mut doc = json!({"a": {"b": "x"}, "c": "y", "d": "z"});
        let rules = [
            PathRule::new("$.c"),
            PathRule::new("$[oops"),
            PathRule::new("$.nope.b"),
            PathRule::new("$.a.b"),
        ];
        assert!(rules[1].compiled().is_err());
        assert_eq!(mask_paths(&mut doc, &rules), 2);
        assert_eq!(doc, json!({"a": {"b": SENTINEL}, "c": SENTINEL, "d": "z"}));
    }

    #[test]
    fn test_overlapping_paths_in_order() {
        let mut doc = json!({"token": {"value": "abc"}});
        let rules = [PathRule::new("$.token"), PathRule::new("$.token.value")];
        // second path now points inside a string and is skipped
        assert_eq!(mask_paths(&mut doc, &rules), 1);
        assert_eq!(doc, json!({"token": SENTINEL}));

        let mut doc = json!({"token": {"value": "abc"}});
        let rules = [PathRule::new("$.token.value"), PathRule::new("$.token")];
        assert_eq!(mask_paths(&mut doc, &rules), 2);
        assert_eq!(doc, json!({"token": SENTINEL}));
    }
}
