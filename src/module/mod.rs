//! Content-owning modules and the registry that resolves them by path.
//!
//! A module owns every content path below its name: module `workloads` owns
//! `workloads`, `workloads/pods`, `workloads/pods/nginx`, and so on. Modules
//! can be local or backed by a plugin process (see `PluginModule`).

mod plugin;
mod registry;

pub use plugin::PluginModule;
pub use registry::{DuplicateModule, ModuleRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::plugin::PluginError;

/// Label selector handed to modules, derived from the session's filters.
pub type LabelSet = BTreeMap<String, String>;

/// Generated page content. Rendering is owned by the modules; this crate only
/// moves the payload around.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<String>,
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<serde_json::Value>,
}

impl ContentResponse {
    /// The explicit "nothing to show" response.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.components.is_empty() && self.buttons.is_empty()
    }
}

/// Options passed to a module content call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentOptions {
    pub label_set: LabelSet,
}

#[derive(Debug, Error)]
pub enum ModuleError {
    /// Soft failure: the caller should redirect to the parent path.
    #[error("content not found: {path}")]
    NotFound { path: String },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Plugin(PluginError),
}

impl ModuleError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<PluginError> for ModuleError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::ContentNotFound(path) => Self::NotFound { path },
            other => Self::Plugin(other),
        }
    }
}

/// A component owning a subtree of content paths.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module name. Doubles as the content path prefix the module owns.
    fn name(&self) -> &str;

    /// Generate content for `content_path`, already relative to the module.
    async fn content(
        &self,
        cancel: &CancellationToken,
        content_path: &str,
        options: &ContentOptions,
    ) -> Result<ContentResponse, ModuleError>;
}

/// Resolves content paths to their owning module.
pub trait ModuleManager: Send + Sync {
    fn module_for_content_path(&self, content_path: &str) -> Option<Arc<dyn Module>>;
}
