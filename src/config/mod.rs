//! Configuration for rexctl
//!
//! Built once from the env file plus the process environment and passed by
//! reference to each component. Precedence: env file > process env > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::env_file::EnvRecord;
use crate::{Error, Result};

/// Default webhook path on the public host
pub const DEFAULT_BOT_PATH: &str = "/telegram/webhook";

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default Ollama model
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5";

/// Default Ollama listening port
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Default Telegram Bot API host
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// rexctl configuration
#[derive(Debug)]
pub struct Config {
    /// Env file the configuration was read from; the webhook secret is
    /// persisted back into it
    pub env_file: PathBuf,

    /// Telegram webhook settings
    pub telegram: TelegramConfig,

    /// Local model server settings
    pub ollama: OllamaConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,
}

/// Telegram webhook settings
#[derive(Debug)]
pub struct TelegramConfig {
    /// Bot token (`TELEGRAM_BOT_TOKEN`)
    pub bot_token: Option<SecretString>,

    /// Public base URL of the tunnel (`PUBLIC_URL`)
    pub public_url: Option<String>,

    /// Webhook path appended to the public URL (`BOT_PATH`)
    pub bot_path: String,

    /// Bot API host (`TELEGRAM_API_BASE`), for self-hosted Bot API servers
    pub api_base: String,
}

/// Local model server settings
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the server (`OLLAMA_URL`)
    pub url: String,

    /// Model name, echoed only (`OLLAMA_MODEL`)
    pub model: String,

    /// Port the server listens on (`OLLAMA_PORT`, else the URL's port)
    pub port: u16,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    /// Build a `reqwest` client honoring these timeouts
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized
    pub fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .user_agent(concat!("rexctl/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

impl Config {
    /// Load the env file and resolve configuration against the process
    /// environment
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvFileNotFound`] if the env file is missing
    pub fn load(env_file: impl AsRef<Path>) -> Result<(Self, EnvRecord)> {
        let env_file = env_file.as_ref();
        let record = EnvRecord::load(env_file)?;
        let config = Self::resolve(env_file, &record, |key| std::env::var(key).ok());
        Ok((config, record))
    }

    /// Resolve configuration from a loaded record and an environment lookup
    pub fn resolve<F>(env_file: &Path, record: &EnvRecord, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| record.get(key).map(str::to_string).or_else(|| env(key));
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ollama_url = non_empty("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let port = non_empty("OLLAMA_PORT")
            .and_then(|s| s.trim().parse().ok())
            .or_else(|| Url::parse(&ollama_url).ok().and_then(|u| u.port()))
            .unwrap_or(DEFAULT_OLLAMA_PORT);

        let defaults = HttpConfig::default();
        let http = HttpConfig {
            connect_timeout: defaults.connect_timeout,
            timeout: non_empty("REX_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
        };

        Self {
            env_file: env_file.to_path_buf(),
            telegram: TelegramConfig {
                bot_token: non_empty("TELEGRAM_BOT_TOKEN").map(SecretString::from),
                public_url: non_empty("PUBLIC_URL").map(|s| s.trim().to_string()),
                bot_path: non_empty("BOT_PATH").unwrap_or_else(|| DEFAULT_BOT_PATH.to_string()),
                api_base: non_empty("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string()),
            },
            ollama: OllamaConfig {
                url: ollama_url,
                model: non_empty("OLLAMA_MODEL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                port,
            },
            http,
        }
    }
}

impl TelegramConfig {
    /// The bot token, or a configuration error naming it
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] if the token is absent or empty
    pub fn require_token(&self) -> Result<&str> {
        self.bot_token
            .as_ref()
            .map(|token| token.expose_secret())
            .ok_or(Error::MissingSetting("TELEGRAM_BOT_TOKEN"))
    }

    /// The public base URL, validated as an absolute http(s) URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] if absent, or [`Error::Config`] if it
    /// is not an http(s) URL
    pub fn require_public_url(&self) -> Result<&str> {
        let raw = self
            .public_url
            .as_deref()
            .ok_or(Error::MissingSetting("PUBLIC_URL"))?;

        let parsed = Url::parse(raw)
            .map_err(|e| Error::Config(format!("PUBLIC_URL {raw:?} is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(Error::Config(format!(
                "PUBLIC_URL {raw:?} must be an absolute http(s) URL"
            )));
        }
        // The bot path is appended verbatim
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Error::Config(format!(
                "PUBLIC_URL {raw:?} must not carry a query or fragment"
            )));
        }

        Ok(raw)
    }
}
