use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{mime_type_for, PluginError, PluginService};
use crate::resources::{AssetContent, PluginRegistry, PluginWebResource};

/// Dashboard-side registry of running plugins, keyed by plugin name.
#[derive(Default)]
pub struct PluginHost {
    plugins: RwLock<BTreeMap<String, Arc<dyn PluginService>>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, replacing any previous one with the same name.
    pub fn insert(&self, name: impl Into<String>, service: Arc<dyn PluginService>) {
        let name = name.into();
        tracing::info!(plugin = %name, "plugin added to host");
        self.plugins.write().insert(name, service);
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn PluginService>> {
        self.plugins.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginService>> {
        self.plugins.read().get(name).cloned()
    }

    /// Plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn PluginService>)> {
        self.plugins
            .read()
            .iter()
            .map(|(name, service)| (name.clone(), Arc::clone(service)))
            .collect()
    }
}

#[async_trait]
impl PluginRegistry for PluginHost {
    async fn web_resources_by_type(
        &self,
        mime_type: &str,
    ) -> Result<Vec<PluginWebResource>, PluginError> {
        let mut out = Vec::new();
        for (plugin_name, service) in self.snapshot() {
            for resource in service.list_assets_by_type(mime_type).await? {
                out.push(PluginWebResource {
                    plugin_name: plugin_name.clone(),
                    path: resource.path,
                });
            }
        }
        Ok(out)
    }

    async fn web_resource(&self, plugin_name: &str, path: &str) -> Result<AssetContent, PluginError> {
        let service = self
            .get(plugin_name)
            .ok_or_else(|| PluginError::PluginNotFound(plugin_name.to_string()))?;
        let content = service.get_asset(path).await?;

        Ok(AssetContent {
            path: path.to_string(),
            mime_type: mime_type_for(path),
            content,
        })
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("plugins", &self.names())
            .finish()
    }
}
