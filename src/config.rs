//! Process configuration, read from environment variables

use crate::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::chunk::MAX_MESSAGE_LENGTH;
use crate::llm::DEFAULT_MODEL_ID;
use crate::runtime::RuntimeSettings;
use crate::store::DEFAULT_HISTORY_LIMIT;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_COMPLETION_API_URL: &str = "http://api.onlysq.ru/ai/v2";
const DEFAULT_COMPLETION_API_KEY: &str = "openai";
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PART_DELAY_MS: u64 = 500;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram_token: String,
    pub telegram_api_base: String,
    pub completion_api_url: String,
    pub completion_api_key: String,
    pub db_path: PathBuf,
    pub default_model: String,
    pub history_limit: usize,
    pub max_message_length: usize,
    pub max_attachment_bytes: u64,
    pub completion_timeout: Duration,
    pub part_delay: Duration,
    pub poll_timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to their
    /// default with a warning; only the bot token is mandatory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token =
            var("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let db_path = var("RELAY_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".chat-relay").join("chat_history.json")
            },
            PathBuf::from,
        );

        let number = |key: &'static str, default: u64| parse_or(key, var(key), default);

        Ok(Self {
            telegram_token,
            telegram_api_base: var("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            completion_api_url: var("COMPLETION_API_URL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_API_URL.to_string()),
            completion_api_key: var("COMPLETION_API_KEY")
                .unwrap_or_else(|| DEFAULT_COMPLETION_API_KEY.to_string()),
            db_path,
            default_model: var("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            history_limit: parse_or("HISTORY_LIMIT", var("HISTORY_LIMIT"), DEFAULT_HISTORY_LIMIT),
            max_message_length: parse_or(
                "MAX_MESSAGE_LENGTH",
                var("MAX_MESSAGE_LENGTH"),
                MAX_MESSAGE_LENGTH,
            ),
            max_attachment_bytes: number("MAX_ATTACHMENT_BYTES", DEFAULT_MAX_ATTACHMENT_BYTES),
            completion_timeout: Duration::from_secs(number(
                "COMPLETION_TIMEOUT_SECS",
                DEFAULT_COMPLETION_TIMEOUT_SECS,
            )),
            part_delay: Duration::from_millis(number("PART_DELAY_MS", DEFAULT_PART_DELAY_MS)),
            poll_timeout: Duration::from_secs(number("POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)),
        })
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            history_limit: self.history_limit,
            max_message_length: self.max_message_length,
            max_attachment_bytes: self.max_attachment_bytes,
            completion_timeout: self.completion_timeout,
            part_delay: self.part_delay,
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Invalid number, using default");
            default
        }),
    }
}
