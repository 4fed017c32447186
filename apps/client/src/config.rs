use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_GUARD_COOLDOWN_MS: u64 = 1000;
const DEFAULT_REANALYZE_DELAY_MS: u64 = 1500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SEARCH_BASE_URL: &str = "https://www.bing.com/search";

/// Client configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    /// Bearer token. `None` routes the user to the login entry point.
    pub api_token: Option<String>,
    pub guard_cooldown: Duration,
    pub reanalyze_delay: Duration,
    pub http_timeout: Duration,
    pub search_base_url: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'API_BASE_URL' is not set")?;

        Ok(Config {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            api_token: lookup("API_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            guard_cooldown: Duration::from_millis(parse_or(
                &lookup,
                "GUARD_COOLDOWN_MS",
                DEFAULT_GUARD_COOLDOWN_MS,
            )?),
            reanalyze_delay: Duration::from_millis(parse_or(
                &lookup,
                "REANALYZE_DELAY_MS",
                DEFAULT_REANALYZE_DELAY_MS,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            search_base_url: lookup("SEARCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(default),
    }
}
