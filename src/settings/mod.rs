//! Centralized TOML-based settings.
//!
//! Settings are loaded from `~/.panorama/settings.toml` with environment
//! variable interpolation support.
//!
//! # Usage
//!
//! ```rust,ignore
//! use panorama::settings::SettingsManager;
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//! let content = ContentManager::builder(modules)
//!     .with_settings(&settings.live)
//!     .build();
//! ```

pub mod loader;
pub mod schema;

pub use loader::{settings_path, SettingsManager};
pub use schema::{
    AssetSettings, LiveSettings, LoggingSettings, PanoramaSettings, PluginSettings,
    ServerSettings,
};
