//! Daemon module — the socket-facing half of the node.
//!
//! One listener thread per configured endpoint, one thread per accepted
//! connection. Every request cycle on a connection starts with a form-type
//! descriptor that the server echoes back before the query is read.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           M2M application                │
//! └─────────────────────────────────────────┘
//!           ▲
//!           │ svr_1_m2mapi.sock  (descriptor, query, result list)
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │           API router                     │
//! │  - negotiates form type                 │
//! │  - fresh proxy connection per request   │
//! └─────────────────────────────────────────┘
//!           ▲
//!           │ svr_1_graphdb
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │           graphdb proxy                  │
//! │  - builds the Cypher statement          │
//! │  - POSTs to the graph backend (HTTP)    │
//! │  - dedups rows into the result list     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Virtual-node endpoints are bound alongside and only hold connections.

pub mod client;
pub mod lifecycle;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;
pub mod vnode;

pub use client::ResolverClient;
pub use lifecycle::{InterruptWatch, Lifecycle};
pub use protocol::{Descriptor, FormType, Request};
pub use server::{start_node, start_node_with, ConnectionHandler, EndpointListener};
pub use session::{Negotiated, Session};
