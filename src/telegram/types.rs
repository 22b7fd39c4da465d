//! Telegram Bot API request/response types

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Update categories the webhook subscribes to
pub const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

/// Telegram setWebhook request
///
/// Sent as `application/x-www-form-urlencoded`; `allowed_updates[]` is
/// repeated once per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWebhookRequest {
    pub url: String,
    pub allowed_updates: Vec<String>,
    /// Echoed back by Telegram in `X-Telegram-Bot-Api-Secret-Token`
    pub secret_token: Option<String>,
    pub drop_pending_updates: bool,
}

impl SetWebhookRequest {
    /// Request for `url` with the default update categories
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            allowed_updates: ALLOWED_UPDATES.iter().map(ToString::to_string).collect(),
            secret_token: None,
            drop_pending_updates: false,
        }
    }

    /// Form fields in wire order
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("url", self.url.clone())];
        fields.extend(
            self.allowed_updates
                .iter()
                .map(|update| ("allowed_updates[]", update.clone())),
        );
        if let Some(secret) = &self.secret_token {
            fields.push(("secret_token", secret.clone()));
        }
        if self.drop_pending_updates {
            fields.push(("drop_pending_updates", "true".to_string()));
        }
        fields
    }
}

/// Generic Bot API response envelope
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

/// `getWebhookInfo` result
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: u64,
    pub last_error_message: Option<String>,
    pub allowed_updates: Option<Vec<String>>,
}

/// Raw reply from one Bot API call
///
/// The body is kept verbatim for display; parsing is advisory.
#[derive(Debug, Clone)]
pub struct ApiReply {
    /// Bot API method that was called
    pub method: &'static str,
    /// HTTP status code
    pub status: u16,
    /// Response body as received
    pub body: String,
}

impl ApiReply {
    /// Parse the body as a Bot API envelope
    #[must_use]
    pub fn envelope<T: DeserializeOwned>(&self) -> Option<TelegramResponse<T>> {
        serde_json::from_str(&self.body).ok()
    }

    /// The envelope's `ok` field, if the body parses
    #[must_use]
    pub fn ok(&self) -> Option<bool> {
        self.envelope::<serde_json::Value>().map(|r| r.ok)
    }

    /// The envelope's `description`, if any
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.envelope::<serde_json::Value>()
            .and_then(|r| r.description)
    }

    /// Treat anything other than `"ok": true` as an error
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Telegram`] when the call was rejected or the
    /// body is not a Bot API envelope
    pub fn ensure_ok(&self) -> crate::Result<()> {
        match self.ok() {
            Some(true) => Ok(()),
            Some(false) => Err(crate::Error::Telegram(format!(
                "{} rejected ({}): {}",
                self.method,
                self.status,
                self.description().unwrap_or_default()
            ))),
            None => Err(crate::Error::Telegram(format!(
                "{} returned an unexpected body ({})",
                self.method, self.status
            ))),
        }
    }
}
