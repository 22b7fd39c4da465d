//! Raw Telegram Bot API calls

use secrecy::ExposeSecret;

use super::types::ApiReply;
use crate::{Error, Result};

impl super::TelegramClient {
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    /// POST a Bot API method, optionally with a form body
    ///
    /// Non-2xx statuses are not errors here; the body is returned as-is.
    pub(super) async fn call(
        &self,
        method: &'static str,
        form: Option<&[(&'static str, String)]>,
    ) -> Result<ApiReply> {
        let mut request = self.client.post(self.method_url(method));
        if let Some(fields) = form {
            request = request.form(fields);
        }

        // Errors carry the request URL, which embeds the bot token
        let response = request
            .send()
            .await
            .map_err(|e| Error::Telegram(format!("{method} request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Telegram(format!("{method} response read error: {}", e.without_url())))?;

        tracing::debug!(method, status, "Telegram API call completed");
        Ok(ApiReply { method, status, body })
    }
}
