//! Client side of the socket protocol.
//!
//! Used by the API router for the hop to the graph-database proxy, and by
//! the command-line client to talk to the API endpoint.

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::session::Session;
use crate::error::{ResolverError, Result};
use crate::query::QueryKind;

pub struct ResolverClient {
    path: PathBuf,
    session: Session,
}

impl ResolverClient {
    /// Dial the endpoint at `path`.
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).map_err(|source| ResolverError::Dial {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            session: Session::new(stream),
        })
    }

    /// One request cycle: descriptor, echo, query, result list.
    pub fn resolve<Q: QueryKind>(&mut self, query: &Q) -> Result<Vec<Q::Output>> {
        self.session.offer(Q::FORM)?;
        self.session.send(query)?;
        let results: Vec<Q::Output> = self.session.recv()?;
        debug!(
            socket = %self.path.display(),
            form = %Q::FORM,
            count = results.len(),
            "resolved"
        );
        Ok(results)
    }
}
