use std::net::IpAddr;
use std::time::Duration;

use crate::breaker::BreakerConfig;
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub api_key: String,
    pub core: CoreConfig,
    pub ai: AiConfig,
    pub worker: WorkerConfig,
    pub limits: RateLimitConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryPolicy,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub base_url: String,
    pub shared_secret: String,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub count: usize,
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub max_attempts: i32,
    pub stale_after_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let api_key = env_required("APPLYFLOW_API_KEY")?;

        let host: IpAddr = env_or("APPLYFLOW_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid APPLYFLOW_HOST: {e}"))?;

        let port: u16 = env_or("APPLYFLOW_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid APPLYFLOW_PORT: {e}"))?;

        let core = CoreConfig {
            base_url: env_required("APPLYFLOW_CORE_URL")?,
            shared_secret: env_required("APPLYFLOW_CORE_SECRET")?,
        };

        let ai = AiConfig {
            base_url: env_required("APPLYFLOW_AI_URL")?,
            api_key: env_required("APPLYFLOW_AI_KEY")?,
        };

        let worker = WorkerConfig {
            count: parse_env("APPLYFLOW_WORKER_COUNT", "1")?,
            poll_interval_secs: parse_env("APPLYFLOW_POLL_INTERVAL_SECS", "5")?,
            batch_size: parse_env("APPLYFLOW_BATCH_SIZE", "20")?,
            max_attempts: parse_env("APPLYFLOW_MAX_ATTEMPTS", "5")?,
            stale_after_minutes: parse_env("APPLYFLOW_STALE_AFTER_MINUTES", "15")?,
        };

        let limits = RateLimitConfig {
            hourly_limit: parse_env("APPLYFLOW_HOURLY_LIMIT", "8")?,
            daily_limit: parse_env("APPLYFLOW_DAILY_LIMIT", "200")?,
            cooldown_minutes: parse_env("APPLYFLOW_RATE_LIMIT_COOLDOWN_MINUTES", "60")?,
        };

        let breaker = BreakerConfig {
            failure_threshold: parse_env("APPLYFLOW_BREAKER_FAILURE_THRESHOLD", "5")?,
            success_threshold: parse_env("APPLYFLOW_BREAKER_SUCCESS_THRESHOLD", "2")?,
            timeout: Duration::from_secs(parse_env("APPLYFLOW_BREAKER_RESET_SECS", "60")?),
        };

        let retry = RetryPolicy {
            max_retries: parse_env("APPLYFLOW_SUBMIT_MAX_RETRIES", "3")?,
            initial_delay: Duration::from_millis(parse_env(
                "APPLYFLOW_SUBMIT_INITIAL_DELAY_MS",
                "1000",
            )?),
            max_delay: Duration::from_millis(parse_env("APPLYFLOW_SUBMIT_MAX_DELAY_MS", "30000")?),
            exponential_backoff: env_or("APPLYFLOW_SUBMIT_EXPONENTIAL_BACKOFF", "true") == "true",
            retryable_statuses: env_or("APPLYFLOW_RETRYABLE_STATUSES", "408,429,500,502,503,504")
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| format!("Invalid APPLYFLOW_RETRYABLE_STATUSES entry '{s}': {e}"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let log_level = env_or("APPLYFLOW_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            host,
            port,
            api_key,
            core,
            ai,
            worker,
            limits,
            breaker,
            retry,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
