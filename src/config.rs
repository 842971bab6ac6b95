use std::time::Duration;

use config::{Config as ConfigLoader, Environment};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::http::pool::HttpSettings;
use crate::limiter::RateLimiterConfig;

const ENV_PREFIX: &str = "CRPT";
const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
const DEFAULT_CONNECT_TIMEOUT_MS: i64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_MS: i64 = 10_000;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit.
    pub const fn duration(self) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(1),
            TimeUnit::Seconds => Duration::from_secs(1),
            TimeUnit::Minutes => Duration::from_secs(60),
            TimeUnit::Hours => Duration::from_secs(60 * 60),
            TimeUnit::Days => Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // General
    pub log_level: String,
    pub log_format: LogFormat,

    // Endpoint
    pub endpoint_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,

    // Rate limit: `request_limit` submissions per one `time_unit`
    pub time_unit: TimeUnit,
    pub request_limit: u32,

    // CLI run
    pub signature: String,
    pub demo_documents: usize,
}

impl Config {
    /// Defaults, overridden by `CRPT_*` variables from the environment or a `.env` file.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self> {
        let loader = ConfigLoader::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .set_default("endpoint_url", DEFAULT_ENDPOINT)?
            .set_default("connect_timeout_ms", DEFAULT_CONNECT_TIMEOUT_MS)?
            .set_default("request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS)?
            .set_default("time_unit", "seconds")?
            .set_default("request_limit", 5_i64)?
            .set_default("signature", "signature")?
            .set_default("demo_documents", 1_i64)?
            .add_source(env.try_parsing(true))
            .build()?;

        Ok(loader.try_deserialize()?)
    }

    pub fn rate_limiter_config(&self) -> Result<RateLimiterConfig> {
        RateLimiterConfig::per(self.time_unit, self.request_limit)
    }

    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint_url).map_err(|e| {
            AppError::InvalidConfiguration(format!("Invalid endpoint URL {}: {}", self.endpoint_url, e))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(AppError::InvalidConfiguration(format!(
                "Unsupported endpoint scheme: {}",
                scheme
            ))),
        }
    }

    pub fn http_settings(&self) -> Result<HttpSettings> {
        // reqwest treats a zero timeout as "fail immediately".
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(AppError::InvalidConfiguration(format!(
                "HTTP timeouts must be positive (connect {} ms, request {} ms)",
                self.connect_timeout_ms, self.request_timeout_ms
            )));
        }

        Ok(HttpSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}
