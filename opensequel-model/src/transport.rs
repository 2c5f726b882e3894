//! Raw HTTP access to the engine.

use crate::{
    config::ConnectionConfig,
    error::{ModelError, Result},
};
use async_trait::async_trait;
use opensearch::{
    OpenSearch,
    auth::Credentials,
    http::{
        headers::HeaderMap,
        request::JsonBody,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
};
use opensequel_log::debug;
use serde_json::Value;

/// HTTP method of a raw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for opensearch::http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => opensearch::http::Method::Get,
            Method::Post => opensearch::http::Method::Post,
            Method::Put => opensearch::http::Method::Put,
            Method::Delete => opensearch::http::Method::Delete,
        }
    }
}

/// Status and parsed body of a completed HTTP exchange.
///
/// Bodies that are not JSON are kept as a JSON string; an empty body is
/// `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Value,
}

impl HttpOutcome {
    /// Create an outcome.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse a raw response body.
    pub fn parse_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Sends one request to the engine and hands back whatever came back.
///
/// Implementations only fail for problems below HTTP; every HTTP status,
/// including errors, is an `Ok(HttpOutcome)`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` to `path` (absolute, starting with `/`).
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpOutcome>;
}

/// [`Transport`] backed by the `opensearch` client.
pub struct OpenSearchTransport {
    client: OpenSearch,
    url: String,
}

impl OpenSearchTransport {
    /// Build a transport from a validated configuration.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let url = opensearch::http::Url::parse(config.url.trim())
            .map_err(|e| ModelError::Configuration(format!("Invalid URL: {}", e)))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(config.request_timeout)
            .disable_proxy();

        if let Some((user, pass)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(user.to_string(), pass.to_string()));
        }

        let transport = builder
            .build()
            .map_err(|e| ModelError::Configuration(e.to_string()))?;

        Ok(Self {
            client: OpenSearch::new(transport),
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Transport for OpenSearchTransport {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        debug!({ method = method, path = path }, "sending request");

        let response = self
            .client
            .send(
                method.into(),
                path,
                HeaderMap::new(),
                None::<&()>,
                body.map(JsonBody::new),
                None,
            )
            .await?;

        let status = response.status_code().as_u16();
        let text = response.text().await?;

        debug!({ status = status, path = path }, "received response");

        Ok(HttpOutcome::new(status, HttpOutcome::parse_body(&text)))
    }
}

impl std::fmt::Debug for OpenSearchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchTransport")
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(HttpOutcome::parse_body(""), Value::Null);
        assert_eq!(HttpOutcome::parse_body("{\"found\":false}"), json!({ "found": false }));
        assert_eq!(HttpOutcome::parse_body("Unauthorized"), json!("Unauthorized"));
    }

    #[test]
    fn test_success_range() {
        assert!(HttpOutcome::new(201, Value::Null).is_success());
        assert!(!HttpOutcome::new(404, Value::Null).is_success());
        assert!(!HttpOutcome::new(199, Value::Null).is_success());
    }

    #[test]
    fn test_transport_rejects_invalid_config() {
        let err = OpenSearchTransport::new(&ConnectionConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_transport_builds() {
        let config = ConnectionConfig::new("http://localhost:9200").with_basic_auth("u", "p");
        assert!(OpenSearchTransport::new(&config).is_ok());
    }
}
