//! Webhook shared secret: generation and persistence

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::Result;
use crate::env_file::{self, EnvRecord};

/// Env key holding the secret
pub const SECRET_KEY: &str = "WEBHOOK_SECRET";

/// Random bytes per secret; 48 bytes encode to 64 URL-safe characters
pub const SECRET_BYTES: usize = 48;

/// Generate a fresh URL-safe secret
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Where the secret in use came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOrigin {
    /// Read from the env file
    Existing,
    /// Generated and written to the env file on this run
    Generated,
}

/// The authoritative secret after [`ensure_secret`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSecret {
    pub value: String,
    pub origin: SecretOrigin,
}

/// Return the stored secret, creating and persisting one if absent
///
/// An empty `WEBHOOK_SECRET=` counts as absent. Repeated calls return the
/// same value; rotating requires clearing the stored value by hand.
///
/// # Errors
///
/// Returns [`crate::Error::EnvFileNotFound`] if the env file is missing, or
/// an IO error if it cannot be rewritten
pub fn ensure_secret(env_file: &Path) -> Result<WebhookSecret> {
    let record = EnvRecord::load(env_file)?;
    if let Some(existing) = record.get_non_empty(SECRET_KEY) {
        tracing::debug!("reusing existing webhook secret");
        return Ok(WebhookSecret {
            value: existing.to_string(),
            origin: SecretOrigin::Existing,
        });
    }

    let value = generate_secret();
    env_file::upsert(env_file, SECRET_KEY, &value)?;
    tracing::info!(path = %env_file.display(), "generated new webhook secret");

    Ok(WebhookSecret {
        value,
        origin: SecretOrigin::Generated,
    })
}
