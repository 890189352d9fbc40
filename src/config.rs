use std::env;

const DEFAULT_LOG_FILTER: &str = "info,cart_service=debug";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub max_concurrency: usize,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let log_filter = env::var("APP_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        Ok(Self {
            database_url,
            host,
            port,
            log_filter,
            max_concurrency: parse_or("APP_MAX_CONCURRENCY", 100),
            body_limit_bytes: parse_or("APP_BODY_LIMIT_BYTES", 1024 * 1024),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
