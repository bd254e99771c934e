//! Content path router for plugin content handlers.
//!
//! Patterns are globs matched against the whole content path. `*` stays
//! within one path segment, `**` spans segments:
//!
//! ```text
//! /                 -> module root only
//! /pods/*           -> /pods/nginx, not /pods/nginx/logs
//! /pods/**          -> anything below /pods/
//! ```

use futures::Future;
use globset::{GlobBuilder, GlobMatcher};
use std::sync::Arc;

use super::request::ContentRequest;
use super::{HandlerFuture, PluginError};
use crate::module::ContentResponse;

/// Handler invoked for a matched content path.
pub type ContentHandler = Arc<dyn Fn(ContentRequest) -> HandlerFuture<ContentResponse> + Send + Sync>;

struct Route {
    pattern: String,
    matcher: GlobMatcher,
    handler: ContentHandler,
}

/// Ordered set of content routes. The first matching route wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a route pattern.
    pub fn handle<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<(), PluginError>
    where
        F: Fn(ContentRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ContentResponse, PluginError>> + Send + 'static,
    {
        let handler: ContentHandler =
            Arc::new(move |req| -> HandlerFuture<ContentResponse> { Box::pin(handler(req)) });
        self.add(pattern, handler)
    }

    pub(crate) fn add(&mut self, pattern: &str, handler: ContentHandler) -> Result<(), PluginError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| PluginError::InvalidRoute {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        self.routes.push(Route {
            pattern: pattern.to_string(),
            matcher,
            handler,
        });
        Ok(())
    }

    /// Find the handler for a content path.
    pub fn find(&self, content_path: &str) -> Option<ContentHandler> {
        self.routes
            .iter()
            .find(|route| route.matcher.is_match(content_path))
            .map(|route| Arc::clone(&route.handler))
    }

    /// Registered patterns, in match order.
    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.pattern.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("patterns", &self.patterns())
            .finish()
    }
}
