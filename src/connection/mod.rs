//! Client connections.
//!
//! A `Connection` owns one `SessionState` and runs every state manager's
//! loop for it on its own task. Client requests are routed to the handler
//! registered for their request type.
//!
//! # Lifecycle
//!
//! ```text
//! Connection::start ──> one task per StateManager ──> close() / drop
//!        │                                               │
//!        └── handle_request(type, payload) ── mutates SessionState
//! ```

mod manager;

pub use manager::{ConnectionManager, DEFAULT_MAX_CONNECTIONS};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PanoramaError, Result};
use crate::payload::{ClientRequest, Payload};
use crate::runtime::ClientSink;
use crate::state::SessionState;

/// Callback handling one client request type.
pub type RequestHandlerFn =
    Arc<dyn Fn(&SessionState, &Payload) -> Result<()> + Send + Sync>;

/// Binds a request type to its handler.
#[derive(Clone)]
pub struct ClientRequestHandler {
    pub request_type: &'static str,
    pub handler: RequestHandlerFn,
}

impl ClientRequestHandler {
    pub fn new<F>(request_type: &'static str, handler: F) -> Self
    where
        F: Fn(&SessionState, &Payload) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            request_type,
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for ClientRequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRequestHandler")
            .field("request_type", &self.request_type)
            .finish_non_exhaustive()
    }
}

/// A per-connection update loop plus the client requests it answers.
#[async_trait]
pub trait StateManager: Send + Sync {
    fn handlers(&self) -> Vec<ClientRequestHandler>;

    /// Run until `cancel` fires.
    async fn start(
        &self,
        cancel: CancellationToken,
        state: Arc<SessionState>,
        client: Arc<dyn ClientSink>,
    );
}

pub struct Connection {
    client: Arc<dyn ClientSink>,
    state: Arc<SessionState>,
    cancel: CancellationToken,
    handlers: HashMap<&'static str, RequestHandlerFn>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    created_at: Instant,
}

impl Connection {
    /// Start every manager's loop for a new client. Must be called from
    /// within a tokio runtime.
    pub fn start(client: Arc<dyn ClientSink>, managers: &[Arc<dyn StateManager>]) -> Self {
        let state = Arc::new(SessionState::new());
        let cancel = CancellationToken::new();

        let mut handlers = HashMap::new();
        let mut tasks = Vec::with_capacity(managers.len());
        for manager in managers {
            for h in manager.handlers() {
                if handlers.insert(h.request_type, h.handler).is_some() {
                    tracing::warn!(request_type = h.request_type, "request handler replaced");
                }
            }

            let manager = Arc::clone(manager);
            let cancel = cancel.clone();
            let state = Arc::clone(&state);
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                manager.start(cancel, state, client).await;
            }));
        }

        tracing::info!(
            connection = client.id(),
            managers = managers.len(),
            "connection started"
        );

        Self {
            client,
            state,
            cancel,
            handlers,
            tasks: Mutex::new(tasks),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        self.client.id()
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Route a client request to its handler.
    pub fn handle_request(&self, request: &ClientRequest) -> Result<()> {
        let handler = self
            .handlers
            .get(request.request_type.as_str())
            .ok_or_else(|| PanoramaError::UnknownRequest(request.request_type.clone()))?;

        tracing::debug!(
            connection = self.id(),
            request_type = %request.request_type,
            "handle client request"
        );
        handler(self.state.as_ref(), &request.payload)
    }

    /// Stop every loop and wait for the tasks to finish.
    pub async fn close(&self) {
        self.cancel.cancel();
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!(connection = self.id(), error = %err, "state manager task failed");
            }
        }
        tracing::info!(connection = self.id(), "connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut request_types: Vec<_> = self.handlers.keys().collect();
        request_types.sort();
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("request_types", &request_types)
            .field("is_closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
