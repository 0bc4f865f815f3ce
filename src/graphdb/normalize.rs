//! Response normalizer — flattens backend JSON into row tuples and maps
//! rows into deduplicated result records.
//!
//! Two response shapes are understood. Which one applies is decided by the
//! backend flavor, never by looking at the payload.
//!
//! ```text
//! neo4j:   {"results": [{"data": [{"row": [..]}, ..]}], "errors": []}
//! graphql: {"data": {"field": [[..], ..]}}  or  {"data": {"field": {"k": [..], ..}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::CapabilityPolicy;
use crate::error::Result;
use crate::query::{ResolvedNode, ResolvedPoint};

/// One positional result tuple.
pub type Row = Vec<Value>;

/// Response shape spoken by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendFlavor {
    /// Transactional HTTP endpoint (`results[].data[].row`).
    #[serde(rename = "neo4j")]
    Neo4j,
    /// Generic query-language endpoint (`data.<field>`).
    #[serde(rename = "graphql")]
    GraphQl,
}

impl BackendFlavor {
    /// Pick the flavor from the target URL.
    pub fn detect(url: &str) -> Self {
        let url = url.to_ascii_lowercase();
        let path = url.split(['?', '#']).next().unwrap_or("");
        let mut segments = path.split('/');
        if url.contains("neo4j") || segments.any(|s| s == "transaction" || s == "tx") {
            BackendFlavor::Neo4j
        } else {
            BackendFlavor::GraphQl
        }
    }
}

/// Parse a response body into rows.
pub fn extract_rows(flavor: BackendFlavor, body: &[u8]) -> Result<Vec<Row>> {
    match flavor {
        BackendFlavor::Neo4j => transaction_rows(body),
        BackendFlavor::GraphQl => graphql_rows(body),
    }
}

#[derive(Deserialize)]
struct TransactionResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<RowRecord>,
}

#[derive(Deserialize)]
struct RowRecord {
    row: Option<Row>,
}

fn transaction_rows(body: &[u8]) -> Result<Vec<Row>> {
    let response: TransactionResponse = serde_json::from_slice(body)?;
    for error in &response.errors {
        warn!(%error, "backend reported statement error");
    }
    Ok(response
        .results
        .into_iter()
        .flat_map(|r| r.data)
        .filter_map(|record| record.row)
        .collect())
}

fn graphql_rows(body: &[u8]) -> Result<Vec<Row>> {
    let response: Value = serde_json::from_slice(body)?;
    let mut rows = Vec::new();

    let Value::Object(mut top) = response else {
        debug!("graphql response is not an object");
        return Ok(rows);
    };

    if let Some(errors) = top.get("errors") {
        warn!(%errors, "backend reported query errors");
    }
    // Only `data` carries results; `extensions` and friends are metadata.
    let fields = match top.remove("data") {
        Some(Value::Object(fields)) => fields,
        _ => {
            debug!("graphql response has no data object");
            return Ok(rows);
        }
    };

    for (_, field) in fields {
        match field {
            Value::Array(items) => rows.extend(items.into_iter().filter_map(as_row)),
            Value::Object(map) => rows.extend(map.into_iter().filter_map(|(_, v)| as_row(v))),
            _ => {}
        }
    }
    Ok(rows)
}

fn as_row(value: Value) -> Option<Row> {
    match value {
        Value::Array(row) => Some(row),
        other => {
            debug!(value = %other, "skipping non-tuple row");
            None
        }
    }
}

/// Scalar cell as text. `null` and nested values don't count.
fn cell(row: &[Value], index: usize) -> Option<String> {
    match row.get(index)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A result record built from a row: `[0]` is the identity key.
pub trait FromRow: Sized {
    fn from_row(row: &[Value]) -> Option<Self>;

    fn identity(&self) -> &str;

    /// Fold a later record with the same identity into this one.
    fn absorb(&mut self, _later: Self) {}
}

impl FromRow for ResolvedPoint {
    fn from_row(row: &[Value]) -> Option<Self> {
        Some(Self {
            resolved_id: cell(row, 0)?,
            address: cell(row, 1)?,
        })
    }

    fn identity(&self) -> &str {
        &self.resolved_id
    }
}

impl FromRow for ResolvedNode {
    fn from_row(row: &[Value]) -> Option<Self> {
        Some(Self {
            resolved_id: cell(row, 0)?,
            capability: cell(row, 1)?,
            additional_capabilities: Vec::new(),
        })
    }

    fn identity(&self) -> &str {
        &self.resolved_id
    }

    fn absorb(&mut self, later: Self) {
        if later.capability != self.capability
            && !self.additional_capabilities.contains(&later.capability)
        {
            self.additional_capabilities.push(later.capability);
        }
    }
}

/// Insertion-ordered records, unique by identity.
#[derive(Debug)]
pub struct ResultSet<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: FromRow> ResultSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add `item` unless its identity is already present. First seen wins.
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.contains_key(item.identity()) {
            return false;
        }
        self.index.insert(item.identity().to_string(), self.items.len());
        self.items.push(item);
        true
    }

    /// Add `item`, folding it into an existing record with the same identity.
    pub fn merge(&mut self, item: T) {
        let existing = self.index.get(item.identity()).copied();
        match existing {
            Some(i) => self.items[i].absorb(item),
            None => {
                self.insert(item);
            }
        }
    }

    /// Records in first-seen order.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

fn records<T: FromRow>(rows: Vec<Row>) -> impl Iterator<Item = T> {
    rows.into_iter().filter_map(|row| {
        let record = T::from_row(&row);
        if record.is_none() {
            debug!(?row, "skipping malformed row");
        }
        record
    })
}

/// Rows into points, one per `resolved_id`, first row wins.
pub fn normalize_points(rows: Vec<Row>) -> Vec<ResolvedPoint> {
    let mut set = ResultSet::new();
    for point in records(rows) {
        set.insert(point);
    }
    set.into_vec()
}

/// Rows into nodes, one per `resolved_id`; `policy` decides what later rows add.
pub fn normalize_nodes(rows: Vec<Row>, policy: CapabilityPolicy) -> Vec<ResolvedNode> {
    let mut set = ResultSet::new();
    for node in records(rows) {
        match policy {
            CapabilityPolicy::FirstMatch => {
                set.insert(node);
            }
            CapabilityPolicy::Accumulate => set.merge(node),
        }
    }
    set.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn neo4j_body(rows: &[[&str; 2]]) -> Vec<u8> {
        let data: Vec<Value> = rows
            .iter()
            .map(|r| json!({ "row": [r[0], r[1]], "meta": [null, null] }))
            .collect();
        serde_json::to_vec(&json!({
            "results": [{ "columns": ["a", "b"], "data": data }],
            "errors": []
        }))
        .unwrap()
    }

    #[test]
    fn test_detect_flavor_from_url() {
        assert_eq!(
            BackendFlavor::detect("http://localhost:7474/db/data/transaction/commit"),
            BackendFlavor::Neo4j
        );
        assert_eq!(
            BackendFlavor::detect("http://localhost:7474/db/neo4j/tx/commit"),
            BackendFlavor::Neo4j
        );
        assert_eq!(
            BackendFlavor::detect("http://graph.local:8080/graphql"),
            BackendFlavor::GraphQl
        );
    }

    #[test]
    fn test_detect_matches_whole_path_segments() {
        assert_eq!(
            BackendFlavor::detect("http://gw.local:8080/txgraph/graphql"),
            BackendFlavor::GraphQl
        );
        assert_eq!(
            BackendFlavor::detect("http://gw.local:8080/transactions-api/graphql"),
            BackendFlavor::GraphQl
        );
        assert_eq!(
            BackendFlavor::detect("http://db.local:7474/db/data/tx?commit=true"),
            BackendFlavor::Neo4j
        );
    }

    #[test]
    fn test_transaction_rows_flatten_all_results() {
        let body = json!({
            "results": [
                { "data": [{ "row": ["vp1", "addr1"] }, { "row": ["vp2", "addr2"] }] },
                { "data": [{ "row": ["vp3", "addr3"] }, { "meta": [] }] }
            ],
            "errors": []
        });
        let rows = extract_rows(BackendFlavor::Neo4j, body.to_string().as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![json!("vp3"), json!("addr3")]);
    }

    #[test]
    fn test_graphql_rows_from_list_and_object() {
        let list = json!({ "data": { "points": [["vp1", "a1"], ["vp2", "a2"]] } });
        let rows = extract_rows(BackendFlavor::GraphQl, list.to_string().as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let object = json!({ "data": { "points": { "x": ["vp1", "a1"] } } });
        let rows = extract_rows(BackendFlavor::GraphQl, object.to_string().as_bytes()).unwrap();
        assert_eq!(rows, vec![vec![json!("vp1"), json!("a1")]]);
    }

    #[test]
    fn test_graphql_rows_ignore_sections_beside_data() {
        let body = json!({
            "data": { "resolvePoint": [["vp1", "a1"]] },
            "extensions": { "tracing": [["t0", "t1"]] },
            "errors": [{ "message": "partial" }]
        });
        let rows = extract_rows(BackendFlavor::GraphQl, body.to_string().as_bytes()).unwrap();
        let points = normalize_points(rows);
        assert_eq!(
            points,
            vec![ResolvedPoint {
                resolved_id: "vp1".to_string(),
                address: "a1".to_string()
            }]
        );
    }

    #[test]
    fn test_graphql_without_data_has_no_rows() {
        let body = json!({ "errors": [{ "message": "bad query" }], "extensions": { "x": [["a", "b"]] } });
        let rows = extract_rows(BackendFlavor::GraphQl, body.to_string().as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(extract_rows(BackendFlavor::Neo4j, b"<html>").is_err());
        assert!(extract_rows(BackendFlavor::GraphQl, b"{").is_err());
    }

    #[test]
    fn test_duplicate_row_yields_single_record() {
        let rows = extract_rows(
            BackendFlavor::Neo4j,
            &neo4j_body(&[["vp1", "10.0.0.1"], ["vp1", "10.0.0.1"]]),
        )
        .unwrap();
        let points = normalize_points(rows);
        assert_eq!(
            points,
            vec![ResolvedPoint {
                resolved_id: "vp1".to_string(),
                address: "10.0.0.1".to_string()
            }]
        );
    }

    #[test]
    fn test_first_seen_wins_and_order_is_kept() {
        let rows = vec![
            vec![json!("vp2"), json!("b")],
            vec![json!("vp1"), json!("a")],
            vec![json!("vp2"), json!("c")],
        ];
        let points = normalize_points(rows);
        let ids: Vec<_> = points.iter().map(|p| (p.resolved_id.as_str(), p.address.as_str())).collect();
        assert_eq!(ids, vec![("vp2", "b"), ("vp1", "a")]);
    }

    #[test]
    fn test_shapes_normalize_identically() {
        let neo = extract_rows(
            BackendFlavor::Neo4j,
            &neo4j_body(&[["vp1", "10.0.0.1"], ["vp2", "10.0.0.2"], ["vp1", "10.0.0.9"]]),
        )
        .unwrap();
        let gql = json!({
            "data": { "resolvePoint": [["vp1", "10.0.0.1"], ["vp2", "10.0.0.2"], ["vp1", "10.0.0.9"]] }
        });
        let gql = extract_rows(BackendFlavor::GraphQl, gql.to_string().as_bytes()).unwrap();

        assert_eq!(normalize_points(neo), normalize_points(gql));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let rows = vec![
            vec![json!("vp1")],
            vec![json!(null), json!("a")],
            vec![json!(7), json!("numeric id")],
        ];
        let points = normalize_points(rows);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].resolved_id, "7");
    }

    #[test]
    fn test_first_match_policy_drops_later_capabilities() {
        let rows = vec![
            vec![json!("pn1"), json!("temp")],
            vec![json!("pn1"), json!("humidity")],
            vec![json!("pn2"), json!("humidity")],
        ];
        let nodes = normalize_nodes(rows, CapabilityPolicy::FirstMatch);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].capability, "temp");
        assert!(nodes[0].additional_capabilities.is_empty());
    }

    #[test]
    fn test_accumulate_policy_collects_capabilities() {
        let rows = vec![
            vec![json!("pn1"), json!("temp")],
            vec![json!("pn1"), json!("humidity")],
            vec![json!("pn1"), json!("humidity")],
            vec![json!("pn1"), json!("temp")],
        ];
        let nodes = normalize_nodes(rows, CapabilityPolicy::Accumulate);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].capability, "temp");
        assert_eq!(nodes[0].additional_capabilities, vec!["humidity".to_string()]);
    }

    #[test]
    fn test_result_set_insert_reports_duplicates() {
        let mut set = ResultSet::new();
        let p = ResolvedPoint {
            resolved_id: "vp1".to_string(),
            address: "a".to_string(),
        };
        assert!(set.insert(p.clone()));
        assert!(!set.insert(p));
        assert_eq!(set.into_vec().len(), 1);
    }
}
