//! Query builder — turns a decoded request into backend statement text.
//!
//! Values are interpolated directly into the statement; there is no
//! parameter binding, so callers must be trusted.

use serde::Serialize;

use crate::error::Result;
use crate::query::{NodeQuery, PointQuery};

/// Virtual points whose sink lies strictly inside the bounding box.
///
/// Returns `(VPointID, Address)` rows.
pub fn point_statement(query: &PointQuery) -> String {
    format!(
        "MATCH (ps:PSink)-[:isVirtualizedWith]->(vp:VPoint) \
         WHERE ps.Lat > {:.4} AND ps.Lon > {:.4} AND ps.Lat < {:.4} AND ps.Lon < {:.4} \
         RETURN vp.VPointID, vp.Address",
        query.sw.lat, query.sw.lon, query.ne.lat, query.ne.lon
    )
}

/// Nodes behind sink `source_id` offering one of the requested capabilities.
///
/// Returns `(PNodeID, Capability)` rows.
pub fn node_statement(query: &NodeQuery) -> String {
    let caps: Vec<String> = query.capabilities.iter().map(|c| quote(c)).collect();
    format!(
        "MATCH (ps:PSink {{PSinkID: {}}})-[:requestsViaDevApi]->(pn:PNode) \
         WHERE pn.Capability IN [{}] \
         RETURN pn.PNodeID, pn.Capability",
        quote(&query.source_id),
        caps.join(", ")
    )
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

/// Request body: `{"statements": [{"statement": "..."}]}`.
#[derive(Debug, Serialize)]
pub struct Statements<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
}

impl<'a> Statements<'a> {
    /// Envelope holding one statement.
    pub fn single(statement: &'a str) -> Self {
        Self {
            statements: vec![Statement { statement }],
        }
    }

    /// Request body for the transaction endpoint.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
