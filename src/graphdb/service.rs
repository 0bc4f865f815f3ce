//! Graph-database proxy — the socket service that resolves negotiated
//! requests against the backend.

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::backend::GraphBackend;
use super::cypher::{node_statement, point_statement};
use super::normalize::{normalize_nodes, normalize_points, Row};
use crate::config::CapabilityPolicy;
use crate::daemon::protocol::Request;
use crate::daemon::server::ConnectionHandler;
use crate::daemon::session::{Negotiated, Session};
use crate::error::{ResolverError, Result};
use crate::query::{NodeQuery, PointQuery, ResolvedNode, ResolvedPoint};

pub struct GraphDbHandler {
    backend: Arc<dyn GraphBackend>,
    policy: CapabilityPolicy,
}

impl GraphDbHandler {
    pub fn new(backend: Arc<dyn GraphBackend>, policy: CapabilityPolicy) -> Self {
        Self { backend, policy }
    }

    /// Virtual points inside the query box.
    pub fn resolve_point(&self, query: &PointQuery) -> Vec<ResolvedPoint> {
        normalize_points(self.fetch(&point_statement(query)))
    }

    /// Nodes behind the source sink offering a requested capability.
    pub fn resolve_node(&self, query: &NodeQuery) -> Vec<ResolvedNode> {
        normalize_nodes(self.fetch(&node_statement(query)), self.policy)
    }

    /// Backend failures are logged and read as "no rows".
    fn fetch(&self, statement: &str) -> Vec<Row> {
        match self.backend.execute(statement) {
            Ok(rows) => {
                debug!(rows = rows.len(), "backend rows");
                rows
            }
            Err(e) => {
                error!(error = %e, "backend query failed");
                Vec::new()
            }
        }
    }
}

impl ConnectionHandler for GraphDbHandler {
    fn handle(&self, stream: UnixStream) -> Result<()> {
        let mut session = Session::new(stream);

        loop {
            let form = match session.accept_descriptor() {
                Ok(Negotiated::Form(form)) => form,
                Ok(Negotiated::Closed) => return Ok(()),
                Err(ResolverError::UnknownFormType(tag)) => {
                    warn!(form_type = %tag, "ignoring request with unknown form type");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let request = match session.recv_request(form) {
                Ok(request) => request,
                Err(e) if e.is_disconnect() => return Ok(()),
                Err(e) => return Err(e),
            };
            debug!(?request, "graphdb request");

            match request {
                Request::Point(q) => session.send(&self.resolve_point(&q))?,
                Request::Node(q) => session.send(&self.resolve_node(&q))?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::protocol::FormType;
    use crate::query::GeoPoint;
    use serde_json::json;
    use std::sync::Mutex;
    use std::thread;

    /// Returns canned rows and records every statement it was given.
    struct CannedBackend {
        rows: Vec<Row>,
        seen: Mutex<Vec<String>>,
    }

    impl GraphBackend for CannedBackend {
        fn execute(&self, statement: &str) -> Result<Vec<Row>> {
            self.seen.lock().unwrap().push(statement.to_string());
            Ok(self.rows.clone())
        }
    }

    struct FailingBackend;

    impl GraphBackend for FailingBackend {
        fn execute(&self, _statement: &str) -> Result<Vec<Row>> {
            Err(ResolverError::BackendStatus {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn canned(rows: Vec<Row>) -> Arc<CannedBackend> {
        Arc::new(CannedBackend {
            rows,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn serve(handler: GraphDbHandler) -> (Session, thread::JoinHandle<Result<()>>) {
        let (client, server) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || handler.handle(server));
        (Session::new(client), handle)
    }

    #[test]
    fn test_point_request_over_socket() {
        let backend = canned(vec![
            vec![json!("vp1"), json!("10.0.0.1")],
            vec![json!("vp1"), json!("10.0.0.1")],
        ]);
        let handler = GraphDbHandler::new(backend.clone(), CapabilityPolicy::FirstMatch);
        let (mut client, server) = serve(handler);

        client.offer(FormType::Point).unwrap();
        client
            .send(&PointQuery {
                sw: GeoPoint::new(35.0, 139.0),
                ne: GeoPoint::new(35.1, 139.1),
            })
            .unwrap();
        let result: Vec<ResolvedPoint> = client.recv().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].resolved_id, "vp1");

        drop(client);
        server.join().unwrap().unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("ps.Lat > 35.0000"));
    }

    #[test]
    fn test_several_requests_on_one_connection() {
        let backend = canned(vec![vec![json!("pn1"), json!("temp")]]);
        let handler = GraphDbHandler::new(backend.clone(), CapabilityPolicy::FirstMatch);
        let (mut client, server) = serve(handler);

        for _ in 0..3 {
            client.offer(FormType::Node).unwrap();
            client
                .send(&NodeQuery {
                    source_id: "psinkA".to_string(),
                    capabilities: vec!["temp".to_string()],
                })
                .unwrap();
            let result: Vec<ResolvedNode> = client.recv().unwrap();
            assert_eq!(result[0].resolved_id, "pn1");
        }

        drop(client);
        server.join().unwrap().unwrap();
        assert_eq!(backend.seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_backend_failure_yields_empty_result() {
        let handler = GraphDbHandler::new(Arc::new(FailingBackend), CapabilityPolicy::FirstMatch);
        let (mut client, server) = serve(handler);

        client.offer(FormType::Node).unwrap();
        client
            .send(&NodeQuery {
                source_id: "psinkA".to_string(),
                capabilities: vec!["temp".to_string()],
            })
            .unwrap();
        let result: Vec<ResolvedNode> = client.recv().unwrap();
        assert!(result.is_empty());

        drop(client);
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_accumulate_policy_reaches_the_wire() {
        let backend = canned(vec![
            vec![json!("pn1"), json!("temp")],
            vec![json!("pn1"), json!("humidity")],
        ]);
        let handler = GraphDbHandler::new(backend, CapabilityPolicy::Accumulate);
        let result = handler.resolve_node(&NodeQuery {
            source_id: "psinkA".to_string(),
            capabilities: vec!["temp".to_string(), "humidity".to_string()],
        });
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].additional_capabilities, vec!["humidity".to_string()]);
    }
}
