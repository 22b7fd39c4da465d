//! rexctl - Operational toolkit for the Rex Telegram assistant
//!
//! Rex answers Telegram messages with a local Ollama model. This crate covers
//! the plumbing around it:
//! - Loading a `.env` file into an explicit configuration
//! - Registering, removing and inspecting the Telegram webhook
//! - Relaunching the local Ollama server and probing its liveness
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────────┐
//! │   env_file   │────▶│    Config    │────▶│ WebhookRegistrar  │──▶ Bot API
//! └──────┬───────┘     └──────┬───────┘     └───────────────────┘
//!        │                    │
//!        │             ┌──────▼───────┐
//!        └────────────▶│  lifecycle   │──▶ ollama serve
//!                      └──────────────┘
//! ```

pub mod config;
pub mod env_file;
pub mod error;
pub mod lifecycle;
pub mod ollama;
pub mod telegram;
pub mod webhook;

pub use config::Config;
pub use env_file::EnvRecord;
pub use error::{Error, Result};
pub use lifecycle::{LaunchOptions, PollPolicy, PortRelease, ServerCommand};
pub use ollama::OllamaClient;
pub use telegram::{ApiReply, BotApi, TelegramClient};
pub use webhook::{RegisterOptions, WebhookRegistrar};
