//! Graph-database proxy.
//!
//! Builds a statement for each request, runs it on the HTTP graph engine and
//! normalizes whatever comes back into a deduplicated record list.
//!
//! ```text
//! PointQuery ──▶ cypher ──▶ backend (POST) ──▶ normalize ──▶ Vec<ResolvedPoint>
//! ```

pub mod backend;
pub mod cypher;
pub mod normalize;
pub mod service;

pub use backend::{GraphBackend, HttpBackend};
pub use cypher::{node_statement, point_statement, Statements};
pub use normalize::{extract_rows, normalize_nodes, normalize_points, BackendFlavor, Row};
pub use service::GraphDbHandler;
