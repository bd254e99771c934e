//! Registry of live client connections.

use dashmap::DashMap;
use std::sync::Arc;

use super::{Connection, StateManager};
use crate::error::{PanoramaError, Result};
use crate::payload::ClientRequest;
use crate::runtime::ClientSink;
use crate::settings::ServerSettings;

/// Maximum concurrent connections (default)
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Tracks every connected client and the state managers each one runs.
pub struct ConnectionManager {
    connections: DashMap<String, Arc<Connection>>,
    managers: Vec<Arc<dyn StateManager>>,
    pub max_connections: usize,
}

impl ConnectionManager {
    pub fn new(managers: Vec<Arc<dyn StateManager>>, max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            managers,
            max_connections,
        }
    }

    pub fn from_settings(managers: Vec<Arc<dyn StateManager>>, settings: &ServerSettings) -> Self {
        Self::new(managers, settings.max_connections)
    }

    /// Start a connection for `client`, keyed by the client's id.
    pub fn connect(&self, client: Arc<dyn ClientSink>) -> anyhow::Result<Arc<Connection>> {
        if self.connections.len() >= self.max_connections {
            anyhow::bail!("Maximum connection limit ({}) reached", self.max_connections);
        }
        if self.connections.contains_key(client.id()) {
            anyhow::bail!("Connection {} already exists", client.id());
        }

        let connection = Arc::new(Connection::start(client, &self.managers));
        self.connections
            .insert(connection.id().to_string(), Arc::clone(&connection));
        Ok(connection)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|r| r.clone())
    }

    /// Route a request to the connection it arrived on.
    pub fn handle_request(&self, id: &str, request: &ClientRequest) -> Result<()> {
        let connection = self
            .get(id)
            .ok_or_else(|| PanoramaError::UnknownConnection(id.to_string()))?;
        connection.handle_request(request)
    }

    /// Remove a connection and wait for its loops to stop.
    pub async fn disconnect(&self, id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(id)?;
        connection.close().await;
        Some(connection)
    }

    /// Close every connection.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.disconnect(&id).await;
        }
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("managers", &self.managers.len())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}
