//! Route matching logic.
//!
//! # Responsibilities
//! - Match request method (exact, case-sensitive)
//! - Match path prefix (case-sensitive)
//! - Match presence of a query string
//! - Match Content-Type substring (case-insensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Method and path matching are case-sensitive, as on the wire
//! - Content-Type matching is case-insensitive (media types are)
//! - No regex to guarantee O(n) matching

use crate::http::Request;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: String,
}

impl MethodMatcher {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.method == self.method
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.path.starts_with(&self.prefix)
    }
}

/// Matches requests whose target carried a `?`.
#[derive(Debug, Clone, Copy)]
pub struct QueryPresentMatcher;

impl Matcher for QueryPresentMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.has_query
    }
}

/// Matches a substring of the Content-Type header.
#[derive(Debug, Clone)]
pub struct ContentTypeMatcher {
    needle: String,
}

impl ContentTypeMatcher {
    /// The needle is normalized to lowercase for case-insensitive matching.
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_ascii_lowercase(),
        }
    }
}

impl Matcher for ContentTypeMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains(&self.needle))
            .unwrap_or(false)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}
