//! Minimal Telegram config: API URL override only.
//! Loaded from environment variables TELEGRAM_API_URL or TELOXIDE_API_URL.

use anyhow::{Context, Result};
use std::env;

/// Telegram connectivity settings shared by every tenant.
#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub api_url: Option<reqwest::Url>,
}

impl TelegramConfig {
    /// Loads from environment: TELEGRAM_API_URL (or TELOXIDE_API_URL) optional.
    pub fn from_env() -> Result<Self> {
        let raw = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        Self::with_api_url(raw.as_deref())
    }

    /// Builds from an optional URL string; an unparsable URL is an error.
    pub fn with_api_url(api_url: Option<&str>) -> Result<Self> {
        let api_url = api_url
            .map(|raw| {
                reqwest::Url::parse(raw)
                    .with_context(|| format!("Invalid Telegram API URL: {}", raw))
            })
            .transpose()?;
        Ok(Self { api_url })
    }
}
