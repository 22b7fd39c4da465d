//! Ollama liveness probing
//!
//! A server counts as alive only when its version endpoint answers; an open
//! port alone is not enough, since the listener comes up before the API is
//! ready.

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::lifecycle::PollPolicy;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Minimal Ollama HTTP client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
}

impl OllamaClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:11434`)
    #[must_use]
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.ollama.url.clone(), config.http.client()?))
    }

    /// Query `/api/version`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelServer`] if the server is unreachable, answers
    /// with a non-success status, or the body lacks a version
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ModelServer(format!("{url} unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ModelServer(format!("{url} returned {status}")));
        }

        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelServer(format!("{url} returned an invalid body: {e}")))?;

        Ok(body.version)
    }

    /// Whether the server answers its version endpoint
    pub async fn is_alive(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                tracing::debug!(%version, "Ollama is alive");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ollama liveness probe failed");
                false
            }
        }
    }

    /// Poll the version endpoint until it answers or attempts run out
    ///
    /// # Errors
    ///
    /// Returns the last probe error once `policy.attempts` probes have failed
    pub async fn wait_until_ready(&self, policy: PollPolicy) -> Result<String> {
        let mut last_err = Error::ModelServer("no readiness probe was attempted".to_string());

        for attempt in 1..=policy.attempts {
            match self.version().await {
                Ok(version) => {
                    tracing::info!(attempt, %version, "Ollama is ready");
                    return Ok(version);
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Ollama not ready yet");
                    last_err = e;
                }
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        Err(last_err)
    }
}
