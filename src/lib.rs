//! Live-update and plugin core for a cluster dashboard backend.
//!
//! A [`connection::Connection`] binds one client to its [`state::SessionState`]
//! and runs a set of [`connection::StateManager`]s against it:
//!
//! - [`content::ContentManager`] regenerates the content at the client's
//!   current path and follows not-found redirects to the nearest parent.
//! - [`resources::ResourceEventManager`] publishes plugin web assets and only
//!   re-sends when the listing changes.
//!
//! Both are driven by a [`poller::Poller`]. Plugins implement
//! [`plugin::PluginService`], usually through [`plugin::Handler`], and serve
//! their assets over HTTP via the optional `server` feature.
//! [`bootstrap::initialize`] wires everything from `settings.toml`.

pub mod bootstrap;
pub mod connection;
pub mod content;
pub mod error;
pub mod module;
pub mod payload;
pub mod plugin;
pub mod poller;
pub mod resources;
pub mod runtime;
#[cfg(feature = "server")]
pub mod server;
pub mod settings;
pub mod state;
pub mod telemetry;

pub use bootstrap::{BootstrapConfig, Panorama};
pub use connection::{Connection, ConnectionManager, StateManager};
pub use content::{ContentError, ContentManager};
pub use error::{PanoramaError, Result};
pub use payload::{ClientRequest, Payload};
pub use plugin::{Handler, PluginError, PluginHost, PluginService};
pub use resources::ResourceEventManager;
pub use runtime::{ClientSink, Event, EventType};
pub use settings::{PanoramaSettings, SettingsManager};
pub use state::SessionState;
