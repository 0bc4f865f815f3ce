//! Error types for the resolver node.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Everything that can go wrong between a socket and the graph backend.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to bind {role} endpoint {path}: {source}")]
    Bind {
        role: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to dial {path}: {source}")]
    Dial {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("wire codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("unknown form type: {0:?}")]
    UnknownFormType(String),

    #[error("descriptor mismatch: sent {sent:?}, peer echoed {echoed:?}")]
    DescriptorMismatch { sent: String, echoed: String },

    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ResolverError {
    /// True when the peer closed the stream. A close at the negotiation
    /// step ends a session cleanly rather than failing it.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ResolverError::Io(e) => is_eof_kind(e.kind()),
            ResolverError::Codec(e) => match e.as_ref() {
                bincode::ErrorKind::Io(io) => is_eof_kind(io.kind()),
                _ => false,
            },
            _ => false,
        }
    }
}

fn is_eof_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
    )
}
