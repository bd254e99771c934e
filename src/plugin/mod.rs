//! Plugin-side service surface.
//!
//! A plugin is a separate process that answers a small, fixed set of remote
//! calls. This module defines that surface (`PluginService`) and the
//! `Handler` that adapts it into typed requests for plugin authors:
//!
//! - `register` binds the plugin to the dashboard's callback API
//! - `print` / `print_tab` / `object_status` decorate cluster objects
//! - `handle_action` receives user actions
//! - `navigation` / `content` contribute pages, routed by path
//! - asset calls expose plugin-owned stylesheets and scripts
//!
//! The transport that carries these calls between processes is not part of
//! this crate.

mod handler;
mod host;
mod request;
mod router;

pub use handler::{Handler, HandlerBuilder};
pub use host::PluginHost;
pub use request::{ActionRequest, BaseRequest, ContentRequest, NavigationRequest, PrintRequest};
pub use router::Router;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::module::ContentResponse;
use crate::payload::Payload;

/// Mime type used when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin is not registered with the dashboard")]
    NotRegistered,

    #[error("plugin handler doesn't know how to create a dashboard client")]
    MissingDashboardFactory,

    #[error("create api client: {0}")]
    DashboardClient(String),

    #[error("file path not found in plugin: {0}")]
    AssetNotFound(String),

    #[error("content not found: {0}")]
    ContentNotFound(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidRoute {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("{0}")]
    Handler(String),
}

impl PluginError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound(_) | Self::ContentNotFound(_) | Self::PluginNotFound(_)
        )
    }
}

/// Optional capabilities a plugin declares at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Object kinds (`apiVersion/kind`) the plugin adds printer config for.
    #[serde(default)]
    pub supports_printer_config: Vec<String>,
    #[serde(default)]
    pub supports_printer_status: Vec<String>,
    #[serde(default)]
    pub supports_printer_items: Vec<String>,
    #[serde(default)]
    pub supports_object_status: Vec<String>,
    #[serde(default)]
    pub supports_tab: Vec<String>,
    /// Action names the plugin handles.
    #[serde(default)]
    pub action_names: Vec<String>,
    /// Whether the plugin contributes content pages.
    #[serde(default)]
    pub is_module: bool,
}

/// Returned by `register`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub capabilities: Capabilities,
}

/// A static asset owned by a plugin, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebResource {
    pub path: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintResponse {
    #[serde(default)]
    pub config: Vec<serde_json::Value>,
    #[serde(default)]
    pub status: Vec<serde_json::Value>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_status: Option<serde_json::Value>,
}

/// Navigation tree contributed by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub title: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Navigation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

/// Identifies cluster objects for dashboard callback calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectKey {
    pub namespace: String,
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Callback client a plugin uses to talk back to the dashboard.
///
/// Implemented by the transport layer; handed to handlers inside every
/// typed request.
#[async_trait]
pub trait Dashboard: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<serde_json::Value>, PluginError>;

    async fn list(&self, key: &ObjectKey) -> Result<Vec<serde_json::Value>, PluginError>;

    async fn update(&self, object: serde_json::Value) -> Result<(), PluginError>;

    /// Ask the dashboard to regenerate and resend content to its clients.
    async fn force_frontend_update(&self) -> Result<(), PluginError>;
}

/// Builds a dashboard client for the address passed to `register`.
pub type DashboardFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn Dashboard>, PluginError> + Send + Sync>;

/// Future returned by user-supplied capability handlers.
pub type HandlerFuture<T> = BoxFuture<'static, Result<T, PluginError>>;

/// The logical remote-call surface of a plugin.
#[async_trait]
pub trait PluginService: Send + Sync {
    async fn register(&self, dashboard_address: &str) -> Result<Metadata, PluginError>;

    async fn print(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<PrintResponse, PluginError>;

    async fn print_tab(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<TabResponse, PluginError>;

    async fn object_status(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<ObjectStatusResponse, PluginError>;

    async fn handle_action(
        &self,
        cancel: &CancellationToken,
        payload: Payload,
    ) -> Result<(), PluginError>;

    async fn navigation(&self, cancel: &CancellationToken) -> Result<Navigation, PluginError>;

    async fn content(
        &self,
        cancel: &CancellationToken,
        content_path: &str,
    ) -> Result<ContentResponse, PluginError>;

    async fn add_asset(&self, path: &str, content: Vec<u8>) -> Result<(), PluginError>;

    async fn list_assets(&self) -> Result<Vec<WebResource>, PluginError>;

    async fn list_assets_by_type(&self, mime_type: &str) -> Result<Vec<WebResource>, PluginError>;

    /// Asset bytes for an exact path; `PluginError::AssetNotFound` on a miss.
    async fn get_asset(&self, path: &str) -> Result<Vec<u8>, PluginError>;
}

/// Mime type every script asset is listed under.
pub const JAVASCRIPT_MIME_TYPE: &str = "application/javascript";

/// Infer an asset's mime type from its file extension.
///
/// Scripts (`.js`, `.mjs`, `.cjs`) always map to [`JAVASCRIPT_MIME_TYPE`].
pub fn mime_type_for(path: &str) -> String {
    let path = Path::new(path);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if matches!(extension.as_deref(), Some("js" | "mjs" | "cjs")) {
        return JAVASCRIPT_MIME_TYPE.to_string();
    }

    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(mime_type_for("style.css"), "text/css");
        assert_eq!(mime_type_for("nested/dir/theme.css"), "text/css");
        assert_eq!(mime_type_for("app.js"), "application/javascript");
        assert_eq!(mime_type_for("lib/module.MJS"), "application/javascript");
        assert_eq!(mime_type_for("README"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn not_found_variants() {
        assert!(PluginError::AssetNotFound("a.css".into()).is_not_found());
        assert!(!PluginError::NotRegistered.is_not_found());
    }

    #[test]
    fn capabilities_deserialize_with_defaults() {
        let caps: Capabilities = serde_json::from_str(r#"{"isModule": true}"#).unwrap();
        assert!(caps.is_module);
        assert!(caps.action_names.is_empty());
    }
}
