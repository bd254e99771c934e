use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::generator::{ContentGenerator, ModuleContentGenerator};
use super::requests::{
    set_content_path, set_namespace, set_query_params, REQUEST_SET_CONTENT_PATH,
    REQUEST_SET_NAMESPACE, REQUEST_SET_QUERY_PARAMS,
};
use super::ContentError;
use crate::connection::{ClientRequestHandler, StateManager};
use crate::module::{ContentResponse, ModuleManager};
use crate::poller::{self, InterruptiblePoller, Poller, PollerWork};
use crate::runtime::{ClientSink, Event};
use crate::settings::LiveSettings;
use crate::state::SessionState;

/// Redirect hops allowed within one activation (default)
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Fallback regeneration interval (default)
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Builder for [`ContentManager`].
pub struct ContentManagerBuilder {
    module_manager: Arc<dyn ModuleManager>,
    generator: Option<Arc<dyn ContentGenerator>>,
    poller: Option<Arc<dyn Poller>>,
    poll_interval: Duration,
    max_redirects: usize,
    content_prefix: Option<String>,
}

impl ContentManagerBuilder {
    /// Replace the module-backed generator.
    pub fn generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn poller(mut self, poller: Arc<dyn Poller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn content_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.content_prefix = Some(prefix.into());
        self
    }

    /// Apply the `[live]` settings section. The interval is at least one second.
    pub fn with_settings(self, settings: &LiveSettings) -> Self {
        self.poll_interval(Duration::from_secs(settings.poll_interval_secs.max(1)))
            .max_redirects(settings.max_redirects)
            .content_prefix(settings.content_prefix.clone())
    }

    pub fn build(self) -> ContentManager {
        let generator = match self.generator {
            Some(generator) => generator,
            None => {
                let mut generator = ModuleContentGenerator::new(self.module_manager);
                if let Some(prefix) = self.content_prefix {
                    generator = generator.with_content_prefix(prefix);
                }
                Arc::new(generator)
            }
        };

        ContentManager {
            generator,
            poller: self
                .poller
                .unwrap_or_else(|| Arc::new(InterruptiblePoller::new("content"))),
            poll_interval: self.poll_interval,
            max_redirects: self.max_redirects,
        }
    }
}

/// Keeps a client's content in sync with its session's content path.
pub struct ContentManager {
    generator: Arc<dyn ContentGenerator>,
    poller: Arc<dyn Poller>,
    poll_interval: Duration,
    max_redirects: usize,
}

impl ContentManager {
    pub fn builder(module_manager: Arc<dyn ModuleManager>) -> ContentManagerBuilder {
        ContentManagerBuilder {
            module_manager,
            generator: None,
            poller: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            content_prefix: None,
        }
    }

    fn update(&self, state: Arc<SessionState>, client: Arc<dyn ClientSink>) -> ContentUpdate {
        ContentUpdate {
            generator: Arc::clone(&self.generator),
            state,
            client,
            max_redirects: self.max_redirects,
            halted: None,
        }
    }
}

#[async_trait]
impl StateManager for ContentManager {
    fn handlers(&self) -> Vec<ClientRequestHandler> {
        vec![
            ClientRequestHandler::new(REQUEST_SET_CONTENT_PATH, |state, payload| {
                Ok(set_content_path(state, payload)?)
            }),
            ClientRequestHandler::new(REQUEST_SET_NAMESPACE, |state, payload| {
                Ok(set_namespace(state, payload)?)
            }),
            ClientRequestHandler::new(REQUEST_SET_QUERY_PARAMS, |state, payload| {
                Ok(set_query_params(state, payload)?)
            }),
        ]
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        state: Arc<SessionState>,
        client: Arc<dyn ClientSink>,
    ) {
        let (trigger, triggers) = poller::trigger();
        let _subscription = state.on_content_path_change(move |_| trigger.fire());

        let work = self.update(state, client);
        self.poller
            .run(cancel, Some(triggers), Box::new(work), self.poll_interval)
            .await;
    }
}

/// One activation of the content loop: generate, send, follow redirects.
///
/// Redirects are applied with [`SessionState::redirect_content_path`], which
/// does not fire the content-path trigger. After a redirect chain fails the
/// update stays idle until the client sets a new content path.
struct ContentUpdate {
    generator: Arc<dyn ContentGenerator>,
    state: Arc<SessionState>,
    client: Arc<dyn ClientSink>,
    max_redirects: usize,
    /// Content-path revision whose redirect chain failed.
    halted: Option<u64>,
}

impl ContentUpdate {
    fn send(&self, response: &ContentResponse) {
        let result = Event::content(response).and_then(|event| self.client.send(event));
        if let Err(err) = result {
            tracing::warn!(connection = self.client.id(), error = %err, "send content event");
        }
    }

    /// Check redirect number `hops` to `target` against the hop budget and
    /// the paths this activation has already generated.
    fn check_redirect(
        &self,
        visited: &mut HashSet<String>,
        target: &str,
        hops: usize,
    ) -> Result<(), ContentError> {
        if hops > self.max_redirects {
            return Err(ContentError::TooManyRedirects {
                path: target.to_string(),
                limit: self.max_redirects,
            });
        }
        if !visited.insert(target.to_string()) {
            return Err(ContentError::RedirectLoop {
                path: target.to_string(),
                hops,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PollerWork for ContentUpdate {
    async fn poll(&mut self, cancel: &CancellationToken) -> bool {
        let revision = self.state.content_path_revision();
        if self.halted == Some(revision) {
            tracing::debug!(
                connection = self.client.id(),
                content_path = %self.state.content_path(),
                "content halted until the client changes path"
            );
            return false;
        }
        self.halted = None;

        let mut visited = HashSet::from([self.state.content_path()]);
        let mut hops = 0;

        loop {
            let generation = match self.generator.generate(cancel, &self.state).await {
                Ok(generation) => generation,
                Err(err) => {
                    tracing::error!(
                        connection = self.client.id(),
                        content_path = %self.state.content_path(),
                        error = %err,
                        "generate content"
                    );
                    return false;
                }
            };

            let Some(target) = generation.redirect else {
                if !cancel.is_cancelled() {
                    self.send(&generation.response);
                }
                return false;
            };

            hops += 1;
            if let Err(err) = self.check_redirect(&mut visited, &target, hops) {
                tracing::error!(
                    connection = self.client.id(),
                    content_path = %self.state.content_path(),
                    error = %err,
                    "follow content redirect"
                );
                self.halted = Some(revision);
                return false;
            }

            self.state.redirect_content_path(target);
            if cancel.is_cancelled() {
                return false;
            }
            self.send(&generation.response);
        }
    }
}
