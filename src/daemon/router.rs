//! Request router — the API front door.
//!
//! Negotiates with the M2M application, decodes its request and forwards it
//! to the graph-database proxy over a fresh connection, then relays the
//! result list back.

use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use super::client::ResolverClient;
use super::protocol::Request;
use super::server::ConnectionHandler;
use super::session::{Negotiated, Session};
use crate::error::{ResolverError, Result};
use crate::query::QueryKind;

pub struct ApiHandler {
    graphdb: PathBuf,
}

impl ApiHandler {
    /// Forward to the graphdb proxy listening at `graphdb`.
    pub fn new(graphdb: PathBuf) -> Self {
        Self { graphdb }
    }

    /// Proxy one request and relay the answer.
    ///
    /// A failed proxy hop ends only this cycle and nothing is written back;
    /// the caller sees no answer for it. Only a failed write to the caller
    /// is returned as an error.
    fn forward<Q: QueryKind>(&self, session: &mut Session, query: &Q) -> Result<()> {
        let results = match ResolverClient::connect(&self.graphdb).and_then(|mut c| c.resolve(query)) {
            Ok(results) => results,
            Err(e) => {
                error!(form = %Q::FORM, graphdb = %self.graphdb.display(), error = %e, "graphdb call failed");
                return Ok(());
            }
        };
        session.send(&results)
    }
}

impl ConnectionHandler for ApiHandler {
    fn handle(&self, stream: UnixStream) -> Result<()> {
        let mut session = Session::new(stream);

        loop {
            let form = match session.accept_descriptor() {
                Ok(Negotiated::Form(form)) => form,
                Ok(Negotiated::Closed) => {
                    debug!("closed by client");
                    return Ok(());
                }
                Err(ResolverError::UnknownFormType(tag)) => {
                    warn!(form_type = %tag, "ignoring request with unknown form type");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let request = match session.recv_request(form) {
                Ok(request) => request,
                Err(e) if e.is_disconnect() => {
                    debug!("closed by client");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            debug!(form = %request.form_type(), "forwarding request");

            match request {
                Request::Point(q) => self.forward(&mut session, &q)?,
                Request::Node(q) => self.forward(&mut session, &q)?,
            }
        }
    }
}
