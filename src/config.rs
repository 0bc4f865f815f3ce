//! Node configuration — endpoint table, backend location, resolver policy.
//!
//! Loaded from an optional TOML file, then overridden from the process
//! environment. The defaults reproduce the single-server layout under
//! `/tmp/mecm2m`.
//!
//! ```toml
//! capability_policy = "accumulate"
//!
//! [backend]
//! url = "http://localhost:7474/db/data/transaction/commit"
//! username = "neo4j"
//! password = "secret"
//!
//! [[endpoints]]
//! role = "api"
//! path = "/tmp/mecm2m/svr_1_m2mapi.sock"
//! ```

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{ResolverError, Result};
use crate::graphdb::BackendFlavor;

pub const ENV_USERNAME: &str = "NEO4J_USERNAME";
pub const ENV_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_PORT: &str = "NEO4J_PORT";
pub const ENV_BACKEND_URL: &str = "MECM2M_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:7474/db/data/transaction/commit";

/// Which service an endpoint hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    /// Front door for M2M applications.
    Api,
    /// Graph-database proxy in front of the HTTP backend.
    GraphDb,
    /// Virtual node stub.
    VNode,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Api => write!(f, "api"),
            EndpointRole::GraphDb => write!(f, "graphdb"),
            EndpointRole::VNode => write!(f, "vnode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub role: EndpointRole,
    pub path: PathBuf,
}

impl EndpointConfig {
    pub fn new(role: EndpointRole, path: impl Into<PathBuf>) -> Self {
        Self { role, path: path.into() }
    }
}

/// What to do when one node matches several requested capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityPolicy {
    /// Keep the first capability seen for a node, drop the rest.
    #[default]
    FirstMatch,
    /// Keep the first capability and collect later ones alongside it.
    Accumulate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Response shape. Detected from `url` when unset.
    pub flavor: Option<BackendFlavor>,
    /// Per-request timeout in seconds. Unset means wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            username: String::new(),
            password: String::new(),
            flavor: None,
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    /// Target URL with the credentials embedded as basic-auth userinfo.
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ResolverError::Config(format!("backend url {:?}: {}", self.url, e)))?;
        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| ResolverError::Config("backend url cannot carry credentials".into()))?;
            url.set_password(Some(&self.password))
                .map_err(|_| ResolverError::Config("backend url cannot carry credentials".into()))?;
        }
        Ok(url)
    }

    /// Configured flavor, else the one the URL implies.
    pub fn flavor(&self) -> BackendFlavor {
        self.flavor
            .unwrap_or_else(|| BackendFlavor::detect(&self.url))
    }

    /// Request timeout; zero counts as unset.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: Vec<EndpointConfig>,
    pub backend: BackendConfig,
    pub capability_policy: CapabilityPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec![
                EndpointConfig::new(EndpointRole::Api, "/tmp/mecm2m/svr_1_m2mapi.sock"),
                EndpointConfig::new(EndpointRole::GraphDb, "/tmp/mecm2m/svr_1_graphdb"),
                EndpointConfig::new(EndpointRole::VNode, "/tmp/mecm2m/vnode_1_0001.sock"),
                EndpointConfig::new(EndpointRole::VNode, "/tmp/mecm2m/vnode_1_0002.sock"),
                EndpointConfig::new(EndpointRole::VNode, "/tmp/mecm2m/vnode_1_0003.sock"),
            ],
            backend: BackendConfig::default(),
            capability_policy: CapabilityPolicy::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or defaults), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. No environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResolverError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&text)
    }

    /// Parse TOML text; missing keys take defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `NEO4J_*` / `MECM2M_BACKEND_URL` overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(user) = lookup(ENV_USERNAME) {
            self.backend.username = user;
        }
        if let Some(pass) = lookup(ENV_PASSWORD) {
            self.backend.password = pass;
        }
        if let Some(port) = lookup(ENV_PORT) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ResolverError::Config(format!("{} is not a port: {:?}", ENV_PORT, port)))?;
            let mut url = Url::parse(&self.backend.url)
                .map_err(|e| ResolverError::Config(format!("backend url: {}", e)))?;
            url.set_port(Some(port))
                .map_err(|_| ResolverError::Config("backend url cannot take a port".into()))?;
            self.backend.url = url.to_string();
        }
        Ok(())
    }

    /// Reject empty, duplicated or dangling endpoint tables.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(ResolverError::Config("no endpoints configured".into()));
        }
        let mut seen = HashSet::new();
        for ep in &self.endpoints {
            if !seen.insert(&ep.path) {
                return Err(ResolverError::Config(format!(
                    "endpoint path {} configured twice",
                    ep.path.display()
                )));
            }
        }
        for role in [EndpointRole::Api, EndpointRole::GraphDb] {
            if self.endpoints.iter().filter(|e| e.role == role).count() > 1 {
                return Err(ResolverError::Config(format!("more than one {} endpoint", role)));
            }
        }
        if self.endpoint(EndpointRole::Api).is_some() && self.endpoint(EndpointRole::GraphDb).is_none() {
            return Err(ResolverError::Config(
                "api endpoint needs a graphdb endpoint to forward to".into(),
            ));
        }
        Ok(())
    }

    /// First endpoint bound to `role`.
    pub fn endpoint(&self, role: EndpointRole) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|e| e.role == role)
    }

    /// Every socket path, in table order.
    pub fn endpoint_paths(&self) -> Vec<PathBuf> {
        self.endpoints.iter().map(|e| e.path.clone()).collect()
    }
}
