//! Query module — the two resolution requests an M2M application can make.
//!
//! ```ignore
//! PointQuery { sw, ne }                 // which virtual points lie in this box?
//! NodeQuery { source_id, capabilities } // which nodes behind this sink can do X?
//! ```

pub mod types;

pub use types::{
    GeoPoint, NodeQuery, PointQuery, QueryKind, ResolvedNode, ResolvedPoint,
};
