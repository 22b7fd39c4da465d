//! Telegram Bot API client
//!
//! Only the webhook management methods are covered. Responses are returned
//! verbatim as [`ApiReply`] so operators see exactly what Telegram said.

mod api;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use crate::config::Config;
use crate::Result;

pub use types::{ALLOWED_UPDATES, ApiReply, SetWebhookRequest, TelegramResponse, WebhookInfo};

/// Webhook management operations of the Bot API
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Register a webhook (`setWebhook`)
    async fn set_webhook(&self, request: &SetWebhookRequest) -> Result<ApiReply>;

    /// Remove the webhook (`deleteWebhook`)
    async fn delete_webhook(&self) -> Result<ApiReply>;

    /// Query the current webhook (`getWebhookInfo`)
    async fn get_webhook_info(&self) -> Result<ApiReply>;
}

/// HTTP implementation of [`BotApi`]
#[derive(Debug)]
pub struct TelegramClient {
    token: SecretString,
    client: Client,
    api_base: String,
}

impl TelegramClient {
    /// Create a client for `api_base` (e.g. `https://api.telegram.org`)
    #[must_use]
    pub fn new(token: impl Into<String>, api_base: impl Into<String>, client: Client) -> Self {
        Self {
            token: SecretString::from(token.into()),
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingSetting`] if no bot token is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.telegram.require_token()?;
        Ok(Self::new(
            token,
            config.telegram.api_base.clone(),
            config.http.client()?,
        ))
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn set_webhook(&self, request: &SetWebhookRequest) -> Result<ApiReply> {
        self.call("setWebhook", Some(&request.form_fields())).await
    }

    async fn delete_webhook(&self) -> Result<ApiReply> {
        self.call("deleteWebhook", None).await
    }

    async fn get_webhook_info(&self) -> Result<ApiReply> {
        self.call("getWebhookInfo", None).await
    }
}
