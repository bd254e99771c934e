use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Dashboard;
use crate::payload::Payload;

/// Fields shared by every typed request. Built fresh for each call.
#[derive(Clone)]
pub struct BaseRequest {
    /// Cancelled when the caller gives up on the call.
    pub context: CancellationToken,
    pub plugin_name: String,
    pub dashboard: Arc<dyn Dashboard>,
}

impl std::fmt::Debug for BaseRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseRequest")
            .field("plugin_name", &self.plugin_name)
            .field("is_cancelled", &self.context.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Request for `print`, `print_tab` and `object_status`.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub base: BaseRequest,
    pub object: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub base: BaseRequest,
    pub payload: Payload,
}

#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub base: BaseRequest,
}

#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub base: BaseRequest,
    /// Content path as received, relative to the plugin's module.
    pub path: String,
}
