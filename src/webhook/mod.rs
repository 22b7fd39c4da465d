//! Webhook registration against the Telegram Bot API
//!
//! Registration is idempotent: the secret is created once, persisted in the
//! env file and reused on every later run. The env file is assumed to have a
//! single writer; concurrent registrations can race on the secret line.

pub mod secret;

use crate::config::Config;
use crate::env_file::mask_value;
use crate::telegram::{ApiReply, BotApi, SetWebhookRequest};
use crate::Result;

pub use secret::{SECRET_KEY, SecretOrigin, WebhookSecret, ensure_secret, generate_secret};

/// Build the URL Telegram should deliver updates to
///
/// Trailing slashes on `public_url` are dropped and `bot_path` gains a
/// leading slash if it lacks one, so the two never join as `//` or run
/// together.
#[must_use]
pub fn build_webhook_url(public_url: &str, bot_path: &str, secret: &str) -> String {
    let base = public_url.trim().trim_end_matches('/');
    let path = bot_path.trim();
    let slash = if path.starts_with('/') { "" } else { "/" };
    format!("{base}{slash}{path}?secret={secret}")
}

/// Flags for `setWebhook`
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Also send the secret as `secret_token`, so Telegram echoes it in the
    /// `X-Telegram-Bot-Api-Secret-Token` header
    pub secret_header: bool,
    /// Ask Telegram to discard updates queued while no webhook was set
    pub drop_pending_updates: bool,
}

/// Result of a registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// Full webhook URL, including the secret
    pub webhook_url: String,
    /// Whether the secret was reused or created on this run
    pub secret_origin: SecretOrigin,
    /// Telegram's reply to `setWebhook`
    pub reply: ApiReply,
}

/// Result of an unregistration
#[derive(Debug, Clone)]
pub struct Unregistration {
    /// Telegram's reply to `deleteWebhook`
    pub delete: ApiReply,
    /// Telegram's reply to the follow-up `getWebhookInfo`
    pub info: ApiReply,
}

/// Registers and removes the bot's webhook
pub struct WebhookRegistrar<'a, A: BotApi + ?Sized> {
    api: &'a A,
    config: &'a Config,
}

impl<'a, A: BotApi + ?Sized> WebhookRegistrar<'a, A> {
    /// Create a registrar over a Bot API implementation
    #[must_use]
    pub const fn new(api: &'a A, config: &'a Config) -> Self {
        Self { api, config }
    }

    /// Resolve (creating if needed) the secret and the webhook URL
    ///
    /// Performs no network calls.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingSetting`] for a missing token or public
    /// URL, before the env file is touched
    pub fn prepare(&self) -> Result<(String, WebhookSecret)> {
        self.config.telegram.require_token()?;
        let public_url = self.config.telegram.require_public_url()?;

        let secret = ensure_secret(&self.config.env_file)?;
        let url = build_webhook_url(public_url, &self.config.telegram.bot_path, &secret.value);
        Ok((url, secret))
    }

    /// Register the webhook
    ///
    /// The reply is returned whatever Telegram answered; a rejection is only
    /// logged here. Callers wanting a hard failure use
    /// [`ApiReply::ensure_ok`].
    ///
    /// # Errors
    ///
    /// Returns configuration errors before any network call, or a transport
    /// error if Telegram cannot be reached
    pub async fn register(&self, options: RegisterOptions) -> Result<Registration> {
        let (webhook_url, secret) = self.prepare()?;

        let request = SetWebhookRequest {
            secret_token: options.secret_header.then(|| secret.value.clone()),
            drop_pending_updates: options.drop_pending_updates,
            ..SetWebhookRequest::new(webhook_url.clone())
        };

        tracing::info!(
            url = %webhook_url.replace(&secret.value, &mask_value(&secret.value)),
            secret = ?secret.origin,
            "registering Telegram webhook"
        );

        let reply = self.api.set_webhook(&request).await?;
        log_reply(&reply);

        Ok(Registration {
            webhook_url,
            secret_origin: secret.origin,
            reply,
        })
    }

    /// Delete the webhook and fetch the resulting webhook info
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingSetting`] if no token is configured, or
    /// a transport error if Telegram cannot be reached
    pub async fn unregister(&self) -> Result<Unregistration> {
        self.config.telegram.require_token()?;

        let delete = self.api.delete_webhook().await?;
        log_reply(&delete);
        let info = self.api.get_webhook_info().await?;
        log_reply(&info);

        Ok(Unregistration { delete, info })
    }

    /// Fetch the current webhook info
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingSetting`] if no token is configured, or
    /// a transport error if Telegram cannot be reached
    pub async fn info(&self) -> Result<ApiReply> {
        self.config.telegram.require_token()?;
        let info = self.api.get_webhook_info().await?;
        log_reply(&info);
        Ok(info)
    }
}

fn log_reply(reply: &ApiReply) {
    match reply.ok() {
        Some(true) => {
            tracing::debug!(method = reply.method, status = reply.status, "Telegram accepted call");
        }
        Some(false) => tracing::warn!(
            method = reply.method,
            status = reply.status,
            description = %reply.description().unwrap_or_default(),
            "Telegram rejected call"
        ),
        None => tracing::warn!(
            method = reply.method,
            status = reply.status,
            "Telegram returned a non-JSON body"
        ),
    }
}
