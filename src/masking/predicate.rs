//! Name predicates deciding which headers and fields get masked.
//!
//! # Responsibilities
//! - Test a header or field name against a masking rule
//! - Compose rules with OR semantics
//!
//! # Design Decisions
//! - Name and prefix matching is case-insensitive (header names are)
//! - An empty predicate never matches
//! - Composition happens at configuration time; testing is lock-free

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A single rule over a header or field name.
pub trait NameMatcher: Send + Sync + fmt::Debug {
    /// Returns true if the name should be masked.
    fn matches(&self, name: &str) -> bool;
}

/// Matches one of a set of names exactly, ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct NameSetMatcher {
    names: Vec<String>,
}

impl NameSetMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl NameMatcher for NameSetMatcher {
    fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// Matches names starting with a prefix, ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefix: String,
}

impl PrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_ascii_lowercase(),
        }
    }
}

impl NameMatcher for PrefixMatcher {
    fn matches(&self, name: &str) -> bool {
        name.get(..self.prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&self.prefix))
    }
}

/// Matches names against a regular expression.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl NameMatcher for PatternMatcher {
    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Wraps an arbitrary closure.
pub struct FnMatcher<F> {
    f: F,
}

impl<F> fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMatcher(..)")
    }
}

impl<F> NameMatcher for FnMatcher<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, name: &str) -> bool {
        (self.f)(name)
    }
}

/// A composable masking rule: the OR of every matcher added to it.
///
/// Cloning is cheap; matchers are shared behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MaskPredicate {
    matchers: Vec<Arc<dyn NameMatcher>>,
}

impl MaskPredicate {
    /// A predicate that matches nothing.
    pub fn never() -> Self {
        Self::default()
    }

    /// Matches any of `names`, ignoring ASCII case.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_matcher(NameSetMatcher::new(names))
    }

    /// Matches names starting with `prefix`, ignoring ASCII case.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::from_matcher(PrefixMatcher::new(prefix))
    }

    /// Matches names against a regular expression.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_matcher(PatternMatcher::new(pattern)?))
    }

    /// Matches whenever `f` returns true.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::from_matcher(FnMatcher { f })
    }

    pub fn from_matcher(matcher: impl NameMatcher + 'static) -> Self {
        Self {
            matchers: vec![Arc::new(matcher)],
        }
    }

    /// Logical OR with another predicate.
    #[must_use]
    pub fn or(mut self, other: MaskPredicate) -> Self {
        self.matchers.extend(other.matchers);
        self
    }

    /// Returns true if any composed rule matches `name`.
    pub fn test(&self, name: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(name))
    }

    /// True when no rule has been added.
    pub fn is_never(&self) -> bool {
        self.matchers.is_empty()
    }
}
