use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ContentOptions, ContentResponse, Module, ModuleError};
use crate::plugin::PluginService;

/// Module whose content comes from a plugin's `content` capability.
///
/// The module root is passed to the plugin as `/` so that a route for `/`
/// answers it.
pub struct PluginModule {
    name: String,
    service: Arc<dyn PluginService>,
}

impl PluginModule {
    pub fn new(name: impl Into<String>, service: Arc<dyn PluginService>) -> Self {
        Self {
            name: name.into(),
            service,
        }
    }
}

#[async_trait]
impl Module for PluginModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn content(
        &self,
        cancel: &CancellationToken,
        content_path: &str,
        _options: &ContentOptions,
    ) -> Result<ContentResponse, ModuleError> {
        let content_path = if content_path.is_empty() {
            "/"
        } else {
            content_path
        };
        Ok(self.service.content(cancel, content_path).await?)
    }
}
