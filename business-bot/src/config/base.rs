//! AppConfig: webhook endpoint, listen address, stores, logging, metrics export and tenant
//! credentials. Loaded from env.

use std::env;

use anyhow::{Context, Result};
use wbot_telegram::TelegramConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://history.db";
pub const DEFAULT_LOG_FILE: &str = "logs/business-bot.log";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WEBHOOK_BASE_URL: public URL the platform delivers to; tenant routes are appended.
    pub webhook_base_url: String,
    /// LISTEN_ADDR
    pub listen_addr: String,
    /// DATABASE_URL: message history (SQLite)
    pub database_url: String,
    /// REDIS_URL: shared queue store; in-process when unset
    pub redis_url: Option<String>,
    /// LOG_FILE
    pub log_file: String,
    /// OTEL_EXPORTER_OTLP_ENDPOINT: OTLP/gRPC collector for metrics; not exported when unset
    pub otlp_endpoint: Option<String>,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram: TelegramConfig,
    /// TENANT_CREDENTIALS: `id=token` pairs separated by commas
    pub tenant_credentials: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load from environment variables. `listen` overrides LISTEN_ADDR if provided.
    pub fn load(listen: Option<String>) -> Result<Self> {
        let webhook_base_url =
            non_empty_var("WEBHOOK_BASE_URL").context("WEBHOOK_BASE_URL not set")?;
        let listen_addr = listen
            .or_else(|| non_empty_var("LISTEN_ADDR"))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let database_url =
            non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let redis_url = non_empty_var("REDIS_URL");
        let log_file = non_empty_var("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let otlp_endpoint = non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT");
        let telegram = TelegramConfig::from_env()?;
        let tenant_credentials = env::var("TENANT_CREDENTIALS").unwrap_or_default();

        let config = Self {
            webhook_base_url,
            listen_addr,
            database_url,
            redis_url,
            log_file,
            otlp_endpoint,
            telegram,
            tenant_credentials,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks URL-valued settings.
    pub fn validate(&self) -> Result<()> {
        match reqwest::Url::parse(&self.webhook_base_url) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
            _ => anyhow::bail!(
                "WEBHOOK_BASE_URL must be an http(s) URL: {}",
                self.webhook_base_url
            ),
        }
        if let Some(ref url_str) = self.redis_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!("REDIS_URL is set but not a valid URL: {}", url_str);
            }
        }
        if let Some(ref url_str) = self.otlp_endpoint {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "OTEL_EXPORTER_OTLP_ENDPOINT is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        Ok(())
    }
}
