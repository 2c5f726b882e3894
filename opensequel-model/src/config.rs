//! Connection configuration.

use crate::error::{ModelError, Result};
use std::time::Duration;

/// Where the engine lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL of the engine, e.g. `https://localhost:9200`.
    pub url: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration for a single engine URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `OPENSEQUEL_URL` is required; `OPENSEQUEL_USERNAME`,
    /// `OPENSEQUEL_PASSWORD` and `OPENSEQUEL_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("OPENSEQUEL_URL")
            .map_err(|_| ModelError::Configuration("OPENSEQUEL_URL is not set".to_string()))?;

        let mut config = Self::new(url);

        if let Ok(username) = std::env::var("OPENSEQUEL_USERNAME") {
            config.username = Some(username);
        }
        if let Ok(password) = std::env::var("OPENSEQUEL_PASSWORD") {
            config.password = Some(password);
        }
        if let Ok(secs) = std::env::var("OPENSEQUEL_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ModelError::Configuration(format!("Invalid OPENSEQUEL_TIMEOUT_SECS: {}", secs))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Basic auth pair, when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Check the configuration before a transport is built from it.
    pub fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ModelError::Configuration("No URL provided".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ModelError::Configuration(format!(
                "Invalid URL (expected http:// or https://): {}",
                url
            )));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ModelError::Configuration(
                "Basic auth needs both a username and a password".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ModelError::Configuration(
                "Request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
