//! Query and result types exchanged with M2M applications.
//!
//! Separated for modularity - the wire, the router and the graph proxy all
//! share these shapes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::daemon::protocol::FormType;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl FromStr for GeoPoint {
    type Err = String;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON, got {:?}", s))?;
        let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude {:?}", lat))?;
        let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude {:?}", lon))?;
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

// ─── Point resolution ──────────────────────────────────────────────

/// Bounding-box lookup: every virtualized point whose sink lies strictly
/// inside the box spanned by `sw` and `ne`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointQuery {
    pub sw: GeoPoint,
    pub ne: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    pub resolved_id: String,
    pub address: String,
}

// ─── Node resolution ───────────────────────────────────────────────

/// Capability lookup: nodes reachable from sink `source_id` that offer one
/// of `capabilities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeQuery {
    pub source_id: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub resolved_id: String,
    /// First matching capability seen for this node.
    pub capability: String,
    /// Later matches, only filled under the accumulate policy.
    #[serde(default)]
    pub additional_capabilities: Vec<String>,
}

/// Ties a query shape to its format descriptor and result record.
pub trait QueryKind: Serialize + DeserializeOwned + fmt::Debug + Send {
    const FORM: FormType;
    type Output: Serialize + DeserializeOwned + fmt::Debug + Send;
}

impl QueryKind for PointQuery {
    const FORM: FormType = FormType::Point;
    type Output = ResolvedPoint;
}

impl QueryKind for NodeQuery {
    const FORM: FormType = FormType::Node;
    type Output = ResolvedNode;
}
