//! # mecm2m
//!
//! MEC server node that resolves virtual sensor/actuator references for M2M
//! applications.
//!
//! An application asks, over a Unix socket, either for the virtual points
//! inside a geographic rectangle or for the physical nodes behind a sink that
//! offer some capability. The node answers from a graph database reached over
//! HTTP.
//!
//! ## Key Features
//!
//! - **Negotiated**: every request announces its form type and waits for the echo
//! - **Two backends**: Neo4j transaction endpoint or a GraphQL front
//! - **Deduplicated**: one record per resolved identifier, first row wins
//! - **Self-cleaning**: stale socket files are removed on start and on interrupt
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mecm2m::{GeoPoint, PointQuery, ResolverClient};
//! use std::path::Path;
//!
//! let mut client = ResolverClient::connect(Path::new("/tmp/mecm2m/svr_1_m2mapi.sock"))?;
//! let points = client.resolve(&PointQuery {
//!     sw: GeoPoint::new(35.0, 139.0),
//!     ne: GeoPoint::new(35.1, 139.1),
//! })?;
//! for p in points {
//!     println!("{} {}", p.resolved_id, p.address);
//! }
//! # Ok::<(), mecm2m::ResolverError>(())
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod graphdb;
pub mod query;

// Re-exports for convenience
pub use error::{ResolverError, Result};

pub use config::{BackendConfig, CapabilityPolicy, Config, EndpointConfig, EndpointRole};
pub use daemon::{start_node, start_node_with, InterruptWatch, Lifecycle, ResolverClient};
pub use graphdb::{BackendFlavor, GraphBackend, HttpBackend};
pub use query::{GeoPoint, NodeQuery, PointQuery, QueryKind, ResolvedNode, ResolvedPoint};
