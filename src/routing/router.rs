//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in priority order
//! - Look up the single route target for a request
//! - Apply the fallback for methods no route covers
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over a handful of routes; first match wins
//! - Unrecognized methods get an explicit fallback target, never a silent default

use crate::config::RoutesConfig;
use crate::http::Request;
use crate::routing::matcher::{
    AndMatcher, ContentTypeMatcher, Matcher, MethodMatcher, PathPrefixMatcher,
    QueryPresentMatcher,
};

/// What a matched request is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Query-driven computation under the dynamic prefix.
    Arithmetic,
    /// Static file lookup, with directory listing when enabled.
    StaticFile,
    /// Record a multipart POST and extract its attachments.
    MultipartCapture,
    /// Record any other POST.
    PlainCapture,
    /// `200 OK` with an empty body for methods no route covers.
    Acknowledge,
    /// `405 Method Not Allowed`.
    MethodNotAllowed,
}

/// A named condition and the target it selects.
#[derive(Debug)]
pub struct Route {
    pub name: &'static str,
    pub matcher: Box<dyn Matcher>,
    pub target: RouteTarget,
}

/// The outcome of routing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: &'static str,
    pub target: RouteTarget,
}

/// Ordered route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    permissive_fallback: bool,
}

impl Router {
    /// Compile the fixed route table: dynamic, static, multipart capture, capture.
    pub fn from_config(config: &RoutesConfig) -> Self {
        let mut routes = Vec::with_capacity(4);

        if let Some(prefix) = config.dynamic_prefix.as_deref().filter(|p| !p.is_empty()) {
            routes.push(Route {
                name: "dynamic",
                matcher: Box::new(AndMatcher::new(vec![
                    Box::new(MethodMatcher::new("GET")),
                    Box::new(PathPrefixMatcher::new(prefix)),
                    Box::new(QueryPresentMatcher),
                ])),
                target: RouteTarget::Arithmetic,
            });
        }

        routes.push(Route {
            name: "static",
            matcher: Box::new(MethodMatcher::new("GET")),
            target: RouteTarget::StaticFile,
        });
        routes.push(Route {
            name: "multipart-capture",
            matcher: Box::new(AndMatcher::new(vec![
                Box::new(MethodMatcher::new("POST")),
                Box::new(ContentTypeMatcher::new("multipart/form-data")),
            ])),
            target: RouteTarget::MultipartCapture,
        });
        routes.push(Route {
            name: "capture",
            matcher: Box::new(MethodMatcher::new("POST")),
            target: RouteTarget::PlainCapture,
        });

        Self {
            routes,
            permissive_fallback: config.permissive_fallback,
        }
    }

    /// Pick exactly one target for `req`.
    pub fn match_request(&self, req: &Request) -> RouteMatch {
        if let Some(route) = self.routes.iter().find(|r| r.matcher.matches(req)) {
            return RouteMatch {
                name: route.name,
                target: route.target,
            };
        }

        if req.is_malformed() || !self.permissive_fallback {
            return RouteMatch {
                name: "fallback",
                target: RouteTarget::MethodNotAllowed,
            };
        }

        tracing::warn!(
            method = %req.method,
            path = %req.path,
            "Unrecognized method acknowledged with 200 (permissive fallback)"
        );
        RouteMatch {
            name: "fallback",
            target: RouteTarget::Acknowledge,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
