//! Bootstrap - build the live-update stack from `settings.toml`.
//!
//! Loads settings, installs tracing, and wires the content and web resource
//! managers into a [`ConnectionManager`]. Transports call
//! [`ConnectionManager::connect`] for each client they accept.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::connection::{ConnectionManager, StateManager};
use crate::content::ContentManager;
use crate::module::ModuleManager;
use crate::plugin::PluginHost;
use crate::resources::ResourceEventManager;
use crate::settings::{PanoramaSettings, SettingsManager};
use crate::telemetry;

/// Inputs to [`initialize`].
pub struct BootstrapConfig {
    /// Settings file; `~/.panorama/settings.toml` when unset
    pub settings_path: Option<PathBuf>,

    /// Resolves content paths to modules
    pub modules: Arc<dyn ModuleManager>,

    /// Plugins whose web assets are published
    pub plugins: Arc<PluginHost>,
}

/// The initialized services.
pub struct Panorama {
    pub settings_manager: Arc<SettingsManager>,

    /// Settings snapshot taken at startup
    pub settings: PanoramaSettings,

    pub plugins: Arc<PluginHost>,

    pub connections: Arc<ConnectionManager>,
}

impl Panorama {
    /// Start the asset server on the configured address.
    #[cfg(feature = "server")]
    pub async fn serve(
        &self,
    ) -> Result<(std::net::SocketAddr, tokio_util::sync::CancellationToken)> {
        crate::server::start_server(&self.settings.server, self.plugins.clone()).await
    }

    /// Close every client connection.
    pub async fn shutdown(&self) {
        self.connections.shutdown().await;
    }
}

/// Load settings and build the connection manager.
pub async fn initialize(config: BootstrapConfig) -> Result<Panorama> {
    let settings_manager = match config.settings_path {
        Some(path) => SettingsManager::with_path(path).await,
        None => SettingsManager::new().await,
    }
    .context("Failed to initialize settings manager")?;
    let settings_manager = Arc::new(settings_manager);

    // Creates the template on first run
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    let settings = settings_manager.get().await;
    telemetry::init_from_settings(&settings.logging);
    tracing::info!(
        path = %settings_manager.path().display(),
        plugins = config.plugins.names().len(),
        "initializing panorama"
    );

    let content: Arc<dyn StateManager> = Arc::new(
        ContentManager::builder(config.modules)
            .with_settings(&settings.live)
            .build(),
    );
    let resources: Arc<dyn StateManager> = Arc::new(
        ResourceEventManager::builder(config.plugins.clone())
            .with_settings(&settings.assets)
            .build(),
    );
    let connections = Arc::new(ConnectionManager::from_settings(
        vec![content, resources],
        &settings.server,
    ));

    Ok(Panorama {
        settings_manager,
        settings,
        plugins: config.plugins,
        connections,
    })
}
