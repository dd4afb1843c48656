use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_RANKING_EXCERPT_CHARS: usize = 800;
const DEFAULT_ANALYSIS_EXCERPT_CHARS: usize = 1200;
const DEFAULT_TOP_CANDIDATES: usize = 3;
const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub ranking: RankingConfig,
}

/// Knobs for the two-pass ranking pipeline.
///
/// The excerpt lengths are the cost/quality tradeoff of the pipeline: every
/// candidate contributes `ranking_excerpt_chars` to the first prompt, only the
/// top `top_n` contribute `analysis_excerpt_chars` to the second.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub ranking_excerpt_chars: usize,
    pub analysis_excerpt_chars: usize,
    pub top_n: usize,
    pub service_timeout: Duration,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            ranking_excerpt_chars: DEFAULT_RANKING_EXCERPT_CHARS,
            analysis_excerpt_chars: DEFAULT_ANALYSIS_EXCERPT_CHARS,
            top_n: DEFAULT_TOP_CANDIDATES,
            service_timeout: Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECS),
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            bail!("TOP_CANDIDATES must be at least 1");
        }
        if self.ranking_excerpt_chars == 0 || self.analysis_excerpt_chars == 0 {
            bail!("excerpt lengths must be greater than zero");
        }
        if self.analysis_excerpt_chars < self.ranking_excerpt_chars {
            bail!(
                "ANALYSIS_EXCERPT_CHARS ({}) must not be shorter than RANKING_EXCERPT_CHARS ({})",
                self.analysis_excerpt_chars,
                self.ranking_excerpt_chars
            );
        }
        if self.service_timeout.is_zero() {
            bail!("SERVICE_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ranking = RankingConfig {
            ranking_excerpt_chars: env_or("RANKING_EXCERPT_CHARS", DEFAULT_RANKING_EXCERPT_CHARS)?,
            analysis_excerpt_chars: env_or(
                "ANALYSIS_EXCERPT_CHARS",
                DEFAULT_ANALYSIS_EXCERPT_CHARS,
            )?,
            top_n: env_or("TOP_CANDIDATES", DEFAULT_TOP_CANDIDATES)?,
            service_timeout: Duration::from_secs(env_or(
                "SERVICE_TIMEOUT_SECS",
                DEFAULT_SERVICE_TIMEOUT_SECS,
            )?),
        };
        ranking.validate()?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            ranking,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value: '{raw}'"))
}
