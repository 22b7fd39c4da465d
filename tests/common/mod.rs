//! Shared test utilities
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rexctl::telegram::{ApiReply, BotApi, SetWebhookRequest};
use rexctl::{Config, EnvRecord};
use tokio::sync::Mutex;

/// Write an env file named `.env` into `dir`
pub fn write_env(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join(".env");
    std::fs::write(&path, content).expect("failed to write env file");
    path
}

/// Resolve configuration from an env file, ignoring the process environment
pub fn config_from(path: &Path) -> Config {
    let record = EnvRecord::load(path).expect("failed to load env file");
    Config::resolve(path, &record, |_| None)
}

/// Bot API double that records calls and answers `{"ok":true}`
#[derive(Default)]
pub struct RecordingBotApi {
    calls: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<SetWebhookRequest>>>,
}

impl RecordingBotApi {
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn requests(&self) -> Vec<SetWebhookRequest> {
        self.requests.lock().await.clone()
    }

    async fn record(&self, method: &'static str) -> ApiReply {
        self.calls.lock().await.push(method.to_string());
        ApiReply {
            method,
            status: 200,
            body: r#"{"ok":true,"result":true}"#.to_string(),
        }
    }
}

#[async_trait]
impl BotApi for RecordingBotApi {
    async fn set_webhook(&self, request: &SetWebhookRequest) -> rexctl::Result<ApiReply> {
        self.requests.lock().await.push(request.clone());
        Ok(self.record("setWebhook").await)
    }

    async fn delete_webhook(&self) -> rexctl::Result<ApiReply> {
        Ok(self.record("deleteWebhook").await)
    }

    async fn get_webhook_info(&self) -> rexctl::Result<ApiReply> {
        Ok(self.record("getWebhookInfo").await)
    }
}
