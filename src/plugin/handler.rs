//! Typed dispatch for the plugin remote-call surface.

use async_trait::async_trait;
use futures::Future;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::request::{ActionRequest, BaseRequest, ContentRequest, NavigationRequest, PrintRequest};
use super::router::{ContentHandler, Router};
use super::{
    mime_type_for, Capabilities, Dashboard, DashboardFactory, HandlerFuture, Metadata,
    Navigation, ObjectStatusResponse, PluginError, PluginService, PrintResponse, TabResponse,
    WebResource,
};
use crate::module::ContentResponse;
use crate::payload::Payload;
use crate::settings::PluginSettings;

type Func<Req, Resp> = Arc<dyn Fn(Req) -> HandlerFuture<Resp> + Send + Sync>;

fn boxed<Req, Resp, F, Fut>(f: F) -> Func<Req, Resp>
where
    Req: 'static,
    Resp: 'static,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, PluginError>> + Send + 'static,
{
    Arc::new(move |req| -> HandlerFuture<Resp> { Box::pin(f(req)) })
}

#[derive(Default, Clone)]
struct HandlerFuncs {
    print: Option<Func<PrintRequest, PrintResponse>>,
    print_tab: Option<Func<PrintRequest, TabResponse>>,
    object_status: Option<Func<PrintRequest, ObjectStatusResponse>>,
    handle_action: Option<Func<ActionRequest, ()>>,
    navigation: Option<Func<NavigationRequest, Navigation>>,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    path: String,
    mime_type: String,
    content: Vec<u8>,
}

impl StoredAsset {
    fn resource(&self) -> WebResource {
        WebResource {
            path: self.path.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

#[derive(Default)]
struct HandlerState {
    dashboard: Option<Arc<dyn Dashboard>>,
    assets: Vec<StoredAsset>,
}

/// Builder for [`Handler`].
pub struct HandlerBuilder {
    name: String,
    description: String,
    capabilities: Capabilities,
    dashboard_factory: Option<DashboardFactory>,
    funcs: HandlerFuncs,
    routes: Vec<(String, ContentHandler)>,
}

impl HandlerBuilder {
    /// Apply the `[plugins]` settings section. Unset fields keep the values
    /// given to `Handler::builder`.
    pub fn with_settings(mut self, settings: &PluginSettings) -> Self {
        if let Some(name) = &settings.handler_name {
            self.name = name.clone();
        }
        if let Some(description) = &settings.description {
            self.description = description.clone();
        }
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn dashboard_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn Dashboard>, PluginError> + Send + Sync + 'static,
    {
        self.dashboard_factory = Some(Arc::new(factory));
        self
    }

    pub fn print<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PrintRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PrintResponse, PluginError>> + Send + 'static,
    {
        self.funcs.print = Some(boxed(f));
        self
    }

    pub fn print_tab<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PrintRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TabResponse, PluginError>> + Send + 'static,
    {
        self.funcs.print_tab = Some(boxed(f));
        self
    }

    pub fn object_status<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PrintRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ObjectStatusResponse, PluginError>> + Send + 'static,
    {
        self.funcs.object_status = Some(boxed(f));
        self
    }

    pub fn handle_action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        self.funcs.handle_action = Some(boxed(f));
        self
    }

    pub fn navigation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NavigationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Navigation, PluginError>> + Send + 'static,
    {
        self.funcs.navigation = Some(boxed(f));
        self
    }

    /// Add a content route. Routes are tried in the order they are added.
    pub fn route<F, Fut>(mut self, pattern: &str, f: F) -> Self
    where
        F: Fn(ContentRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ContentResponse, PluginError>> + Send + 'static,
    {
        self.routes.push((pattern.to_string(), boxed(f)));
        self
    }

    /// Validate the configuration and compile the routes.
    pub fn build(self) -> Result<Handler, PluginError> {
        let dashboard_factory = self
            .dashboard_factory
            .ok_or(PluginError::MissingDashboardFactory)?;

        let mut router = Router::new();
        for (pattern, handler) in self.routes {
            router.add(&pattern, handler)?;
        }

        let mut capabilities = self.capabilities;
        if !router.is_empty() {
            capabilities.is_module = true;
        }

        Ok(Handler {
            name: self.name,
            description: self.description,
            capabilities,
            dashboard_factory,
            funcs: self.funcs,
            router,
            state: Mutex::new(HandlerState::default()),
        })
    }
}

/// Adapts [`PluginService`] calls into typed handler invocations.
///
/// Capabilities without a configured handler answer with their zero value.
/// A configured handler is only reachable after `register`; before that,
/// calls fail with [`PluginError::NotRegistered`].
pub struct Handler {
    name: String,
    description: String,
    capabilities: Capabilities,
    dashboard_factory: DashboardFactory,
    funcs: HandlerFuncs,
    router: Router,
    state: Mutex<HandlerState>,
}

impl Handler {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> HandlerBuilder {
        HandlerBuilder {
            name: name.into(),
            description: description.into(),
            capabilities: Capabilities::default(),
            dashboard_factory: None,
            funcs: HandlerFuncs::default(),
            routes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().dashboard.is_some()
    }

    fn base_request(&self, cancel: &CancellationToken) -> Result<BaseRequest, PluginError> {
        let dashboard = self
            .state
            .lock()
            .dashboard
            .clone()
            .ok_or(PluginError::NotRegistered)?;

        Ok(BaseRequest {
            context: cancel.clone(),
            plugin_name: self.name.clone(),
            dashboard,
        })
    }
}

#[async_trait]
impl PluginService for Handler {
    async fn register(&self, dashboard_address: &str) -> Result<Metadata, PluginError> {
        let dashboard = (self.dashboard_factory)(dashboard_address)?;
        self.state.lock().dashboard = Some(dashboard);

        tracing::info!(plugin = %self.name, address = dashboard_address, "plugin registered");

        Ok(Metadata {
            name: self.name.clone(),
            description: self.description.clone(),
            capabilities: self.capabilities.clone(),
        })
    }

    async fn print(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<PrintResponse, PluginError> {
        let Some(f) = &self.funcs.print else {
            return Ok(PrintResponse::default());
        };
        let base = self.base_request(cancel)?;
        f(PrintRequest { base, object }).await
    }

    async fn print_tab(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<TabResponse, PluginError> {
        let Some(f) = &self.funcs.print_tab else {
            return Ok(TabResponse::default());
        };
        let base = self.base_request(cancel)?;
        f(PrintRequest { base, object }).await
    }

    async fn object_status(
        &self,
        cancel: &CancellationToken,
        object: serde_json::Value,
    ) -> Result<ObjectStatusResponse, PluginError> {
        let Some(f) = &self.funcs.object_status else {
            return Ok(ObjectStatusResponse::default());
        };
        let base = self.base_request(cancel)?;
        f(PrintRequest { base, object }).await
    }

    async fn handle_action(
        &self,
        cancel: &CancellationToken,
        payload: Payload,
    ) -> Result<(), PluginError> {
        let Some(f) = &self.funcs.handle_action else {
            return Ok(());
        };
        let base = self.base_request(cancel)?;
        f(ActionRequest { base, payload }).await
    }

    async fn navigation(&self, cancel: &CancellationToken) -> Result<Navigation, PluginError> {
        let Some(f) = &self.funcs.navigation else {
            return Ok(Navigation::default());
        };
        let base = self.base_request(cancel)?;
        f(NavigationRequest { base }).await
    }

    async fn content(
        &self,
        cancel: &CancellationToken,
        content_path: &str,
    ) -> Result<ContentResponse, PluginError> {
        let Some(f) = self.router.find(content_path) else {
            tracing::debug!(plugin = %self.name, content_path, "no route for content path");
            return Ok(ContentResponse::empty());
        };
        let base = self.base_request(cancel)?;
        f(ContentRequest {
            base,
            path: content_path.to_string(),
        })
        .await
    }

    async fn add_asset(&self, path: &str, content: Vec<u8>) -> Result<(), PluginError> {
        let mime_type = mime_type_for(path);
        let mut state = self.state.lock();
        match state.assets.iter_mut().find(|a| a.path == path) {
            Some(existing) => {
                existing.mime_type = mime_type;
                existing.content = content;
            }
            None => state.assets.push(StoredAsset {
                path: path.to_string(),
                mime_type,
                content,
            }),
        }
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<WebResource>, PluginError> {
        let state = self.state.lock();
        Ok(state.assets.iter().map(StoredAsset::resource).collect())
    }

    async fn list_assets_by_type(&self, mime_type: &str) -> Result<Vec<WebResource>, PluginError> {
        let state = self.state.lock();
        Ok(state
            .assets
            .iter()
            .filter(|a| a.mime_type == mime_type)
            .map(StoredAsset::resource)
            .collect())
    }

    async fn get_asset(&self, path: &str) -> Result<Vec<u8>, PluginError> {
        let state = self.state.lock();
        state
            .assets
            .iter()
            .find(|a| a.path == path)
            .map(|a| a.content.clone())
            .ok_or_else(|| PluginError::AssetNotFound(path.to_string()))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::ObjectKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopDashboard;

    #[async_trait]
    impl Dashboard for NoopDashboard {
        async fn get(&self, _key: &ObjectKey) -> Result<Option<serde_json::Value>, PluginError> {
            Ok(None)
        }

        async fn list(&self, _key: &ObjectKey) -> Result<Vec<serde_json::Value>, PluginError> {
            Ok(Vec::new())
        }

        async fn update(&self, _object: serde_json::Value) -> Result<(), PluginError> {
            Ok(())
        }

        async fn force_frontend_update(&self) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn builder() -> HandlerBuilder {
        Handler::builder("sample", "a sample plugin")
            .dashboard_factory(|_addr| Ok(Arc::new(NoopDashboard) as Arc<dyn Dashboard>))
    }

    fn bare() -> Handler {
        builder().build().unwrap()
    }

    #[test]
    fn build_requires_dashboard_factory() {
        let err = Handler::builder("sample", "").build().unwrap_err();
        assert!(matches!(err, PluginError::MissingDashboardFactory));
    }

    #[test]
    fn build_rejects_invalid_route() {
        let err = builder()
            .route("/[", |_req| async { Ok(ContentResponse::empty()) })
            .build()
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidRoute { .. }));
    }

    #[tokio::test]
    async fn register_returns_metadata() {
        let handler = builder()
            .capabilities(Capabilities {
                action_names: vec!["sample/refresh".into()],
                ..Default::default()
            })
            .route("/", |_req| async { Ok(ContentResponse::empty()) })
            .build()
            .unwrap();

        assert!(!handler.is_registered());
        let metadata = handler.register("localhost:7777").await.unwrap();
        assert!(handler.is_registered());
        assert_eq!(metadata.name, "sample");
        assert_eq!(metadata.description, "a sample plugin");
        assert_eq!(metadata.capabilities.action_names, vec!["sample/refresh"]);
        assert!(metadata.capabilities.is_module);
    }

    #[tokio::test]
    async fn settings_override_name_and_description() {
        let handler = builder()
            .with_settings(&PluginSettings {
                handler_name: Some("renamed".into()),
                description: None,
            })
            .build()
            .unwrap();

        let metadata = handler.register("localhost:7777").await.unwrap();
        assert_eq!(metadata.name, "renamed");
        assert_eq!(metadata.description, "a sample plugin");
        assert_eq!(handler.name(), "renamed");
    }

    #[tokio::test]
    async fn register_surfaces_factory_error() {
        let handler = Handler::builder("sample", "")
            .dashboard_factory(|addr| Err(PluginError::DashboardClient(format!("dial {addr}"))))
            .build()
            .unwrap();

        let err = handler.register("nowhere").await.unwrap_err();
        assert!(matches!(err, PluginError::DashboardClient(_)));
        assert!(!handler.is_registered());
    }

    #[tokio::test]
    async fn missing_handlers_return_zero_values() {
        let handler = bare();
        let cancel = CancellationToken::new();
        let object = serde_json::json!({"kind": "Pod"});

        assert_eq!(handler.print(&cancel, object.clone()).await.unwrap(), PrintResponse::default());
        assert_eq!(handler.print_tab(&cancel, object.clone()).await.unwrap(), TabResponse::default());
        assert_eq!(
            handler.object_status(&cancel, object).await.unwrap(),
            ObjectStatusResponse::default()
        );
        handler.handle_action(&cancel, Payload::new()).await.unwrap();
        assert_eq!(handler.navigation(&cancel).await.unwrap(), Navigation::default());
        assert!(handler.content(&cancel, "/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn configured_handler_before_register_fails_closed() {
        let handler = builder()
            .print(|_req| async { Ok(PrintResponse::default()) })
            .build()
            .unwrap();

        let err = handler
            .print(&CancellationToken::new(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotRegistered));
    }

    #[tokio::test]
    async fn print_handler_receives_typed_request() {
        let handler = builder()
            .print(|req: PrintRequest| async move {
                assert_eq!(req.base.plugin_name, "sample");
                Ok(PrintResponse {
                    config: vec![req.object],
                    ..Default::default()
                })
            })
            .build()
            .unwrap();
        handler.register("localhost:7777").await.unwrap();

        let object = serde_json::json!({"kind": "Deployment"});
        let resp = handler.print(&CancellationToken::new(), object.clone()).await.unwrap();
        assert_eq!(resp.config, vec![object]);
    }

    #[tokio::test]
    async fn action_handler_sees_payload_and_errors_propagate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let handler = builder()
            .handle_action(move |req: ActionRequest| {
                seen.fetch_add(1, Ordering::SeqCst);
                async move {
                    match req.payload.string("action") {
                        Ok(name) if name == "sample/refresh" => Ok(()),
                        _ => Err(PluginError::handler("unknown action")),
                    }
                }
            })
            .build()
            .unwrap();
        handler.register("localhost:7777").await.unwrap();

        let cancel = CancellationToken::new();
        let mut payload = Payload::new();
        payload.insert("action", serde_json::json!("sample/refresh"));
        handler.handle_action(&cancel, payload).await.unwrap();

        let err = handler.handle_action(&cancel, Payload::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown action");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn content_is_routed_by_path() {
        let handler = builder()
            .route("/", |_req| async {
                Ok(ContentResponse {
                    title: vec!["root".into()],
                    ..Default::default()
                })
            })
            .route("/items/*", |req: ContentRequest| async move {
                Ok(ContentResponse {
                    title: vec![req.path],
                    ..Default::default()
                })
            })
            .build()
            .unwrap();
        handler.register("localhost:7777").await.unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(handler.content(&cancel, "/").await.unwrap().title, vec!["root"]);
        assert_eq!(
            handler.content(&cancel, "/items/first").await.unwrap().title,
            vec!["/items/first"]
        );
        assert!(handler.content(&cancel, "/other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn content_not_found_from_route_propagates() {
        let handler = builder()
            .route("/items/*", |req: ContentRequest| async move {
                Err(PluginError::ContentNotFound(req.path))
            })
            .build()
            .unwrap();
        handler.register("localhost:7777").await.unwrap();

        let err = handler
            .content(&CancellationToken::new(), "/items/gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn asset_round_trip_with_inferred_mime() {
        let handler = bare();
        handler.add_asset("style.css", b"body{}".to_vec()).await.unwrap();

        assert_eq!(handler.get_asset("style.css").await.unwrap(), b"body{}");
        assert_eq!(
            handler.list_assets().await.unwrap(),
            vec![WebResource {
                path: "style.css".into(),
                mime_type: "text/css".into(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let err = bare().get_asset("missing.css").await.unwrap_err();
        assert!(matches!(err, PluginError::AssetNotFound(ref p) if p == "missing.css"));
    }

    #[tokio::test]
    async fn readding_asset_replaces_in_place() {
        let handler = bare();
        handler.add_asset("a.css", b"one".to_vec()).await.unwrap();
        handler.add_asset("b.css", b"two".to_vec()).await.unwrap();
        handler.add_asset("a.css", b"three".to_vec()).await.unwrap();

        let paths: Vec<String> = handler
            .list_assets()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(paths, vec!["a.css", "b.css"]);
        assert_eq!(handler.get_asset("a.css").await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn list_assets_by_type_filters() {
        let handler = bare();
        handler.add_asset("a.css", b"a".to_vec()).await.unwrap();
        handler.add_asset("logo.png", b"png".to_vec()).await.unwrap();

        let css = handler.list_assets_by_type("text/css").await.unwrap();
        assert_eq!(css.len(), 1);
        assert_eq!(css[0].path, "a.css");
        assert!(handler.list_assets_by_type("text/html").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_asset_access_stays_consistent() {
        let handler = Arc::new(bare());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let handler = Arc::clone(&handler);
            tasks.push(tokio::spawn(async move {
                let path = format!("asset-{}.css", i % 4);
                handler.add_asset(&path, vec![i as u8]).await.unwrap();
                handler.list_assets().await.unwrap();
                handler.get_asset(&path).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let assets = handler.list_assets().await.unwrap();
        assert_eq!(assets.len(), 4);
    }
}
