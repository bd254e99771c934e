use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::filters::filters_to_label_set;
use super::ContentError;
use crate::module::{ContentOptions, ContentResponse, ModuleManager};
use crate::state::SessionState;

/// Leading segment of every client content path.
pub const DEFAULT_CONTENT_PREFIX: &str = "/content/";

/// Result of one generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub response: ContentResponse,
    /// Content path to move the session to before generating again.
    pub redirect: Option<String>,
}

impl Generation {
    pub fn done(response: ContentResponse) -> Self {
        Self {
            response,
            redirect: None,
        }
    }

    /// Empty response plus a redirect target.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            response: ContentResponse::empty(),
            redirect: Some(target.into()),
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }
}

/// Produces content for the session's current content path.
///
/// Generators read the session but never move its content path; a redirect
/// is returned as [`Generation::redirect`] and applied by the caller.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        state: &SessionState,
    ) -> Result<Generation, ContentError>;
}

/// Parent of a module-relative content path, re-prefixed for the client.
///
/// `overview/pods/nginx` redirects to `{prefix}overview/pods`.
pub fn not_found_redirect_path(prefix: &str, content_path: &str) -> String {
    let trimmed = content_path.trim_end_matches('/');
    let parent = trimmed.rsplit_once('/').map_or("", |(parent, _)| parent);
    format!("{prefix}{parent}")
}

/// Default generator: resolve the owning module and ask it for content.
pub struct ModuleContentGenerator {
    module_manager: Arc<dyn ModuleManager>,
    content_prefix: String,
}

impl ModuleContentGenerator {
    pub fn new(module_manager: Arc<dyn ModuleManager>) -> Self {
        Self {
            module_manager,
            content_prefix: DEFAULT_CONTENT_PREFIX.to_string(),
        }
    }

    pub fn with_content_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.content_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl ContentGenerator for ModuleContentGenerator {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        state: &SessionState,
    ) -> Result<Generation, ContentError> {
        let content_path = state.content_path();
        if content_path.is_empty() {
            return Ok(Generation::done(ContentResponse::empty()));
        }

        let started = Instant::now();
        let stripped = content_path
            .strip_prefix(self.content_prefix.as_str())
            .unwrap_or(&content_path);
        if stripped.is_empty() {
            return Ok(Generation::done(ContentResponse::empty()));
        }

        let module = self
            .module_manager
            .module_for_content_path(stripped)
            .ok_or_else(|| ContentError::NoModule(stripped.to_string()))?;

        let module_path = stripped.strip_prefix(module.name()).unwrap_or(stripped);
        let options = ContentOptions {
            label_set: filters_to_label_set(&state.filters()),
        };

        match module.content(cancel, module_path, &options).await {
            Ok(response) => {
                tracing::debug!(
                    content_path = %content_path,
                    module = module.name(),
                    elapsed = ?started.elapsed(),
                    "generate content"
                );
                Ok(Generation::done(response))
            }
            Err(err) if err.is_not_found() => {
                let target = not_found_redirect_path(&self.content_prefix, stripped);
                tracing::debug!(
                    content_path = %content_path,
                    redirect = %target,
                    "path not found, redirecting to parent"
                );
                Ok(Generation::redirect(target))
            }
            Err(err) => Err(ContentError::Module(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ContentResponse, Module, ModuleError, ModuleRegistry};
    use crate::state::Filter;
    use parking_lot::Mutex;

    /// Records every call and answers from a fixed table.
    struct Recording {
        name: &'static str,
        calls: Mutex<Vec<(String, ContentOptions)>>,
        missing: Vec<&'static str>,
    }

    #[async_trait]
    impl Module for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn content(
            &self,
            _cancel: &CancellationToken,
            content_path: &str,
            options: &ContentOptions,
        ) -> Result<ContentResponse, ModuleError> {
            self.calls
                .lock()
                .push((content_path.to_string(), options.clone()));
            if self.missing.iter().any(|m| *m == content_path) {
                return Err(ModuleError::not_found(content_path));
            }
            if content_path == "/broken" {
                return Err(ModuleError::Failed("boom".into()));
            }
            Ok(ContentResponse {
                title: vec![format!("{}{}", self.name, content_path)],
                ..Default::default()
            })
        }
    }

    fn setup(missing: Vec<&'static str>) -> (Arc<Recording>, ModuleContentGenerator) {
        let module = Arc::new(Recording {
            name: "foo",
            calls: Mutex::new(Vec::new()),
            missing,
        });
        let mut registry = ModuleRegistry::new();
        registry.register(module.clone()).unwrap();
        (module, ModuleContentGenerator::new(Arc::new(registry)))
    }

    #[test]
    fn redirect_path_is_parent() {
        assert_eq!(not_found_redirect_path("/content/", "foo/bar"), "/content/foo");
        assert_eq!(not_found_redirect_path("/content/", "foo/bar/"), "/content/foo");
        assert_eq!(not_found_redirect_path("/content/", "foo/a/b"), "/content/foo/a");
        assert_eq!(not_found_redirect_path("/content/", "foo"), "/content/");
    }

    #[tokio::test]
    async fn empty_path_generates_empty_response() {
        let (module, generator) = setup(vec![]);
        let state = SessionState::new();

        let generation = generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap();
        assert_eq!(generation, Generation::done(ContentResponse::empty()));
        assert!(module.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn strips_both_prefixes_and_passes_filters() {
        let (module, generator) = setup(vec![]);
        let state = SessionState::new();
        state.set_content_path("/content/foo/bar");
        state.set_filters(vec![Filter::new("app", "nginx")]);

        let generation = generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap();
        assert!(!generation.is_redirect());
        assert_eq!(generation.response.title, vec!["foo/bar"]);

        let calls = module.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/bar");
        assert_eq!(calls[0].1.label_set["app"], "nginx");
    }

    #[tokio::test]
    async fn not_found_redirects_to_parent() {
        let (_module, generator) = setup(vec!["/bar"]);
        let state = SessionState::new();
        state.set_content_path("/content/foo/bar");

        let generation = generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap();
        assert_eq!(generation, Generation::redirect("/content/foo"));
        assert_eq!(state.content_path(), "/content/foo/bar");
    }

    #[tokio::test]
    async fn module_root_not_found_settles_on_bare_prefix() {
        let (module, generator) = setup(vec![""]);
        let state = SessionState::new();
        state.set_content_path("/content/foo");

        let cancel = CancellationToken::new();
        let first = generator.generate(&cancel, &state).await.unwrap();
        assert_eq!(first, Generation::redirect("/content/"));

        state.redirect_content_path("/content/");
        let second = generator.generate(&cancel, &state).await.unwrap();
        assert_eq!(second, Generation::done(ContentResponse::empty()));
        assert_eq!(module.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn unknown_module_is_an_error() {
        let (_module, generator) = setup(vec![]);
        let state = SessionState::new();
        state.set_content_path("/content/missing/page");

        let err = generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NoModule(ref p) if p == "missing/page"));
    }

    #[tokio::test]
    async fn other_module_errors_propagate() {
        let (_module, generator) = setup(vec![]);
        let state = SessionState::new();
        state.set_content_path("/content/foo/broken");

        let err = generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Module(_)));
        assert_eq!(state.content_path(), "/content/foo/broken");
    }

    #[tokio::test]
    async fn custom_prefix_is_honoured() {
        let (module, generator) = setup(vec![]);
        let generator = generator.with_content_prefix("/ui/");
        let state = SessionState::new();
        state.set_content_path("/ui/foo/bar");

        generator
            .generate(&CancellationToken::new(), &state)
            .await
            .unwrap();
        assert_eq!(module.calls.lock()[0].0, "/bar");
    }
}
