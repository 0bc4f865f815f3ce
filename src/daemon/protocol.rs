//! Daemon protocol — format descriptors and the request types they select.
//!
//! Every request cycle on a socket is:
//!
//! ```text
//! client                         server
//!   ── Descriptor{form_type} ──▶
//!   ◀── Descriptor (echo) ─────
//!   ── PointQuery | NodeQuery ─▶
//!   ◀── Vec<Resolved*> ────────
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ResolverError, Result};
use crate::query::{NodeQuery, PointQuery};

/// Tag sent ahead of every payload so the peer knows what to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub form_type: String,
}

impl Descriptor {
    /// Descriptor carrying an arbitrary tag.
    pub fn new(form_type: impl Into<String>) -> Self {
        Self { form_type: form_type.into() }
    }
}

/// Request shapes a descriptor can announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormType {
    Point,
    Node,
}

impl FormType {
    /// Tag as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            FormType::Point => "Point",
            FormType::Node => "Node",
        }
    }

    /// Descriptor announcing this shape.
    pub fn descriptor(self) -> Descriptor {
        Descriptor::new(self.as_str())
    }

    /// Interpret a received tag.
    ///
    /// `Ok(None)` is the termination signal (empty tag or `exit`).
    pub fn parse(tag: &str) -> Result<Option<Self>> {
        match tag {
            "Point" => Ok(Some(FormType::Point)),
            "Node" => Ok(Some(FormType::Node)),
            "" | "exit" => Ok(None),
            other => Err(ResolverError::UnknownFormType(other.to_string())),
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request, tagged by the shape its descriptor announced.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Point(PointQuery),
    Node(NodeQuery),
}

impl Request {
    /// Shape this request was decoded as.
    pub fn form_type(&self) -> FormType {
        match self {
            Request::Point(_) => FormType::Point,
            Request::Node(_) => FormType::Node,
        }
    }
}
