//! Plugin web resources pushed to clients.
//!
//! Plugins ship stylesheets and scripts the browser has to load. The
//! resource event manager lists them on every activation and sends a
//! `webResources` event only when the listing changed since the last send.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::connection::{ClientRequestHandler, StateManager};
use crate::plugin::{PluginError, JAVASCRIPT_MIME_TYPE};
use crate::poller::{InterruptiblePoller, Poller, PollerWork};
use crate::runtime::{ClientSink, Event, EventType};
use crate::settings::AssetSettings;
use crate::state::SessionState;

/// Prefix of plugin asset URLs (default)
pub const DEFAULT_ASSETS_ROOT: &str = "/api/assets";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A resource listed by a plugin, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginWebResource {
    pub plugin_name: String,
    pub path: String,
}

/// A single plugin asset with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetContent {
    pub path: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Lookup side of the plugin manager.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    async fn web_resources_by_type(
        &self,
        mime_type: &str,
    ) -> Result<Vec<PluginWebResource>, PluginError>;

    async fn web_resource(&self, plugin_name: &str, path: &str) -> Result<AssetContent, PluginError>;
}

/// URL a client loads a plugin asset from.
pub fn asset_url(root: &str, plugin_name: &str, path: &str) -> String {
    format!(
        "{}/plugin/{}/path/{}",
        root.trim_end_matches('/'),
        plugin_name,
        path.trim_start_matches('/')
    )
}

fn default_categories() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("css".to_string(), "text/css".to_string()),
        ("js".to_string(), JAVASCRIPT_MIME_TYPE.to_string()),
    ])
}

/// Builds the `webResources` payload from the plugin registry.
pub struct WebResourceGenerator {
    registry: Arc<dyn PluginRegistry>,
    assets_root: String,
    /// Payload key -> mime type, iterated in key order.
    categories: BTreeMap<String, String>,
}

impl WebResourceGenerator {
    pub fn new(registry: Arc<dyn PluginRegistry>) -> Self {
        Self {
            registry,
            assets_root: DEFAULT_ASSETS_ROOT.to_string(),
            categories: default_categories(),
        }
    }

    async fn list(&self, mime_type: &str) -> Vec<String> {
        match self.registry.web_resources_by_type(mime_type).await {
            Ok(resources) => resources
                .iter()
                .map(|r| asset_url(&self.assets_root, &r.plugin_name, &r.path))
                .collect(),
            Err(err) => {
                tracing::warn!(mime_type, error = %err, "list plugin web resources");
                Vec::new()
            }
        }
    }

    /// `{"resources": {"css": [...], "js": [...]}}`
    pub async fn payload(&self) -> serde_json::Value {
        let mut resources = serde_json::Map::new();
        for (category, mime_type) in &self.categories {
            resources.insert(category.clone(), self.list(mime_type).await.into());
        }
        serde_json::json!({ "resources": resources })
    }
}

/// Builder for [`ResourceEventManager`].
pub struct ResourceEventManagerBuilder {
    generator: WebResourceGenerator,
    poller: Option<Arc<dyn Poller>>,
    poll_interval: Duration,
}

impl ResourceEventManagerBuilder {
    pub fn poller(mut self, poller: Arc<dyn Poller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn assets_root(mut self, root: impl Into<String>) -> Self {
        self.generator.assets_root = root.into();
        self
    }

    pub fn categories(mut self, categories: BTreeMap<String, String>) -> Self {
        self.generator.categories = categories;
        self
    }

    /// Apply the `[assets]` settings section.
    pub fn with_settings(self, settings: &AssetSettings) -> Self {
        self.poll_interval(Duration::from_secs(settings.poll_interval_secs.max(1)))
            .assets_root(settings.root.clone())
            .categories(settings.categories.clone())
    }

    pub fn build(self) -> ResourceEventManager {
        ResourceEventManager {
            generator: Arc::new(self.generator),
            poller: self
                .poller
                .unwrap_or_else(|| Arc::new(InterruptiblePoller::new("webResources"))),
            poll_interval: self.poll_interval,
        }
    }
}

/// Sends plugin web resources to a client whenever the listing changes.
pub struct ResourceEventManager {
    generator: Arc<WebResourceGenerator>,
    poller: Arc<dyn Poller>,
    poll_interval: Duration,
}

impl ResourceEventManager {
    pub fn builder(registry: Arc<dyn PluginRegistry>) -> ResourceEventManagerBuilder {
        ResourceEventManagerBuilder {
            generator: WebResourceGenerator::new(registry),
            poller: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    fn update(&self, client: Arc<dyn ClientSink>) -> ResourceUpdate {
        ResourceUpdate {
            generator: Arc::clone(&self.generator),
            client,
            previous: None,
        }
    }
}

#[async_trait]
impl StateManager for ResourceEventManager {
    fn handlers(&self) -> Vec<ClientRequestHandler> {
        Vec::new()
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        _state: Arc<SessionState>,
        client: Arc<dyn ClientSink>,
    ) {
        let work = self.update(client);
        self.poller
            .run(cancel, None, Box::new(work), self.poll_interval)
            .await;
    }
}

struct ResourceUpdate {
    generator: Arc<WebResourceGenerator>,
    client: Arc<dyn ClientSink>,
    /// Serialized payload of the last send.
    previous: Option<Vec<u8>>,
}

#[async_trait]
impl PollerWork for ResourceUpdate {
    async fn poll(&mut self, cancel: &CancellationToken) -> bool {
        let data = self.generator.payload().await;
        if cancel.is_cancelled() {
            return false;
        }

        let current = match serde_json::to_vec(&data) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "serialize web resources");
                return false;
            }
        };
        if self.previous.as_deref() == Some(current.as_slice()) {
            return false;
        }

        let event = Event {
            event_type: EventType::WebResources,
            data,
        };
        match self.client.send(event) {
            Ok(()) => self.previous = Some(current),
            Err(err) => {
                tracing::warn!(connection = self.client.id(), error = %err, "send web resources")
            }
        }
        false
    }
}
