//! Daemon server — binds the configured Unix sockets and hands every
//! accepted connection to the handler for that endpoint's role.

use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::router::ApiHandler;
use super::vnode::VNodeHandler;
use crate::config::{Config, EndpointConfig, EndpointRole};
use crate::error::{ResolverError, Result};
use crate::graphdb::{GraphBackend, GraphDbHandler, HttpBackend};

/// Serves one accepted connection until it ends.
///
/// The handler owns the stream; it is closed when `handle` returns.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, stream: UnixStream) -> Result<()>;
}

/// A bound endpoint that has not started accepting yet.
pub struct EndpointListener {
    endpoint: EndpointConfig,
    listener: UnixListener,
}

impl EndpointListener {
    /// Bind the socket. The path must not exist.
    pub fn bind(endpoint: &EndpointConfig) -> Result<Self> {
        let listener = UnixListener::bind(&endpoint.path).map_err(|source| ResolverError::Bind {
            role: endpoint.role.to_string(),
            path: endpoint.path.clone(),
            source,
        })?;
        info!(role = %endpoint.role, socket = %endpoint.path.display(), "endpoint listening");
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Run the accept loop on its own thread.
    pub fn spawn(self, handler: Arc<dyn ConnectionHandler>) -> JoinHandle<()> {
        thread::spawn(move || self.accept_loop(handler))
    }

    fn accept_loop(self, handler: Arc<dyn ConnectionHandler>) {
        let role = self.endpoint.role;
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let handler = Arc::clone(&handler);
                    thread::spawn(move || serve_connection(role, stream, handler.as_ref()));
                }
                Err(e) => {
                    error!(role = %role, socket = %self.endpoint.path.display(), error = %e, "accept failed");
                    break;
                }
            }
        }
        info!(role = %role, socket = %self.endpoint.path.display(), "endpoint stopped accepting");
    }
}

fn serve_connection(role: EndpointRole, stream: UnixStream, handler: &dyn ConnectionHandler) {
    let span = info_span!("connection", role = %role, conn = %Uuid::new_v4());
    let _guard = span.enter();

    debug!("connection accepted");
    match handler.handle(stream) {
        Ok(()) => debug!("connection closed"),
        Err(e) => warn!(error = %e, "connection handler error"),
    }
}

/// Handler for every role, sharing one backend.
pub struct Handlers {
    api: Option<Arc<dyn ConnectionHandler>>,
    graphdb: Option<Arc<dyn ConnectionHandler>>,
    vnode: Arc<dyn ConnectionHandler>,
}

impl Handlers {
    /// Build handlers for the roles present in `config`.
    pub fn new(config: &Config, backend: Arc<dyn GraphBackend>) -> Self {
        let api = config.endpoint(EndpointRole::GraphDb).map(|graphdb| {
            Arc::new(ApiHandler::new(graphdb.path.clone())) as Arc<dyn ConnectionHandler>
        });
        let graphdb = config.endpoint(EndpointRole::GraphDb).map(|_| {
            Arc::new(GraphDbHandler::new(backend, config.capability_policy))
                as Arc<dyn ConnectionHandler>
        });
        Self {
            api,
            graphdb,
            vnode: Arc::new(VNodeHandler),
        }
    }

    /// Handler serving `role`, if one was built.
    pub fn for_role(&self, role: EndpointRole) -> Option<Arc<dyn ConnectionHandler>> {
        match role {
            EndpointRole::Api => self.api.clone(),
            EndpointRole::GraphDb => self.graphdb.clone(),
            EndpointRole::VNode => Some(Arc::clone(&self.vnode)),
        }
    }
}

/// Bind every configured endpoint against the HTTP backend and start serving.
pub fn start_node(config: &Config) -> Result<Vec<JoinHandle<()>>> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    info!(flavor = ?backend.flavor(), "graph backend configured");
    start_node_with(config, backend)
}

/// Like [`start_node`] with an explicit backend.
///
/// An endpoint that fails to bind is logged and skipped; the others still
/// start. Fails only when nothing could be bound.
pub fn start_node_with(
    config: &Config,
    backend: Arc<dyn GraphBackend>,
) -> Result<Vec<JoinHandle<()>>> {
    let handlers = Handlers::new(config, backend);
    let mut running = Vec::new();

    for endpoint in &config.endpoints {
        let Some(handler) = handlers.for_role(endpoint.role) else {
            warn!(role = %endpoint.role, "no handler for role, endpoint skipped");
            continue;
        };
        match EndpointListener::bind(endpoint) {
            Ok(listener) => running.push(listener.spawn(handler)),
            Err(e) => error!(error = %e, "endpoint not started"),
        }
    }

    if running.is_empty() {
        return Err(ResolverError::Config("no endpoint could be bound".into()));
    }
    Ok(running)
}
