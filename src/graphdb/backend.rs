//! Backend client — posts statements to the graph engine over HTTP.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use tracing::debug;

use super::cypher::Statements;
use super::normalize::{extract_rows, BackendFlavor, Row};
use crate::config::BackendConfig;
use crate::error::{ResolverError, Result};

/// Something that can run a statement and hand back row tuples.
pub trait GraphBackend: Send + Sync {
    fn execute(&self, statement: &str) -> Result<Vec<Row>>;
}

/// HTTP graph engine reached at a single commit URL.
pub struct HttpBackend {
    client: Client,
    url: Url,
    flavor: BackendFlavor,
}

impl HttpBackend {
    /// Client for the configured URL. No timeout unless one is set.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            url: config.endpoint_url()?,
            flavor: config.flavor(),
        })
    }

    /// Response shape this backend is parsed as.
    pub fn flavor(&self) -> BackendFlavor {
        self.flavor
    }

    /// POST `payload` and return the whole response body.
    ///
    /// Credentials travel as the URL's userinfo, which reqwest turns into a
    /// basic `Authorization` header.
    pub fn post(&self, payload: String) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "*/*")
            .body(payload)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ResolverError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes()?;
        debug!(
            host = self.url.host_str().unwrap_or(""),
            status = status.as_u16(),
            bytes = bytes.len(),
            "backend responded"
        );
        Ok(bytes.to_vec())
    }
}

impl GraphBackend for HttpBackend {
    fn execute(&self, statement: &str) -> Result<Vec<Row>> {
        let payload = Statements::single(statement).to_json()?;
        let body = self.post(payload)?;
        extract_rows(self.flavor, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(url: String) -> BackendConfig {
        BackendConfig {
            url,
            username: "neo4j".to_string(),
            password: "secret".to_string(),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_posts_statement_with_json_headers_and_basic_auth() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/db/data/transaction/commit")
            .match_header("content-type", "application/json")
            .match_header("accept", "*/*")
            .match_header("authorization", "Basic bmVvNGo6c2VjcmV0")
            .match_body(Matcher::PartialJsonString(
                r#"{"statements": [{"statement": "RETURN 1"}]}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"columns":["x"],"data":[{"row":["1","2"]}]}],"errors":[]}"#)
            .create();

        let backend =
            HttpBackend::new(&config(format!("{}/db/data/transaction/commit", server.url()))).unwrap();
        assert_eq!(backend.flavor(), BackendFlavor::Neo4j);

        let rows = backend.execute("RETURN 1").unwrap();
        assert_eq!(rows.len(), 1);
        mock.assert();
    }

    #[test]
    fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/db/data/transaction/commit")
            .with_status(401)
            .with_body("unauthorized")
            .create();

        let backend =
            HttpBackend::new(&config(format!("{}/db/data/transaction/commit", server.url()))).unwrap();
        match backend.execute("RETURN 1") {
            Err(ResolverError::BackendStatus { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("expected status error, got {:?}", other.map(|r| r.len())),
        }
        mock.assert();
    }

    #[test]
    fn test_unreachable_backend_is_error() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let backend = HttpBackend::new(&config("http://127.0.0.1:9/graphql".to_string())).unwrap();
        assert!(matches!(backend.execute("RETURN 1"), Err(ResolverError::Backend(_))));
    }
}
