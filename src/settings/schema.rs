//! Settings schema definitions for Panorama.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root settings structure.
///
/// Loaded from `~/.panorama/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Live content loop tuning
    pub live: LiveSettings,

    /// Plugin web asset publishing
    pub assets: AssetSettings,

    /// Plugin metadata defaults
    pub plugins: PluginSettings,

    /// Asset HTTP server
    pub server: ServerSettings,

    pub logging: LoggingSettings,
}

/// Content generation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Fallback regeneration interval when no trigger arrives
    pub poll_interval_secs: u64,

    /// Redirect hops allowed within one activation
    pub max_redirects: usize,

    /// Leading segment stripped from client content paths
    pub content_prefix: String,
}

/// Web resource event settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Prefix of plugin asset URLs sent to clients
    pub root: String,

    /// Resource interval for the web resource loop
    pub poll_interval_secs: u64,

    /// Tracked categories: payload key -> mime type
    pub categories: BTreeMap<String, String>,
}

/// Plugin metadata defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Overrides the name passed to `Handler::builder`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Asset HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address (supports $ENV_VAR syntax)
    pub bind: String,

    pub port: u16,

    /// Concurrent client connections
    pub max_connections: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. "panorama=debug" (supports $ENV_VAR syntax)
    pub filter: String,
}

impl Default for PanoramaSettings {
    fn default() -> Self {
        Self {
            version: 1,
            live: LiveSettings::default(),
            assets: AssetSettings::default(),
            plugins: PluginSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_redirects: 10,
            content_prefix: "/content/".to_string(),
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: "/api/assets".to_string(),
            poll_interval_secs: 5,
            categories: BTreeMap::from([
                ("css".to_string(), "text/css".to_string()),
                ("js".to_string(), "application/javascript".to_string()),
            ]),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7777,
            max_connections: 64,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "panorama=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PanoramaSettings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.live.poll_interval_secs, 5);
        assert_eq!(settings.live.max_redirects, 10);
        assert_eq!(settings.live.content_prefix, "/content/");
        assert_eq!(settings.assets.categories["css"], "text/css");
        assert_eq!(settings.assets.categories["js"], "application/javascript");
        assert_eq!(settings.server.port, 7777);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            version = 1
            [live]
            max_redirects = 3
        "#;

        let settings: PanoramaSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.live.max_redirects, 3);
        // Defaults should fill in missing fields
        assert_eq!(settings.live.poll_interval_secs, 5);
        assert_eq!(settings.logging.filter, "panorama=info");
    }

    #[test]
    fn test_categories_replace_defaults() {
        let toml = r#"
            [assets.categories]
            css = "text/css"
        "#;

        let settings: PanoramaSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.assets.categories.len(), 1);
        assert_eq!(settings.assets.root, "/api/assets");
    }

    #[test]
    fn test_serialize_settings() {
        let settings = PanoramaSettings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("version = 1"));
        assert!(toml_str.contains("[live]"));
        assert!(!toml_str.contains("handler_name"));
    }
}
