//! Server configuration

use std::time::Duration as StdDuration;

use chrono::Duration;
use rand::Rng;

use crate::email::SmtpConfig;
use crate::session::SessionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; `None` keeps everything in memory
    pub database_path: Option<String>,

    /// HS256 secret for session and refresh tokens
    pub jwt_secret: String,

    /// Session, idle and refresh lifetimes
    pub session: SessionConfig,

    /// How often the expiry sweeper runs
    pub sweep_interval: StdDuration,

    /// Minimum notice between creating a request and the requested time
    pub min_request_lead: Duration,

    /// Base URL of the web client, used in verification and reset links
    pub client_url: String,

    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,

    /// bcrypt cost for new password hashes
    pub bcrypt_cost: u32,

    /// SMTP configuration; `None` logs emails to the console
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            database_path: None,
            jwt_secret: String::new(),
            session: SessionConfig::default(),
            sweep_interval: StdDuration::from_secs(5 * 60),
            min_request_lead: Duration::hours(3),
            client_url: "http://localhost:5173".to_string(),
            cors_origins: Vec::new(),
            bcrypt_cost: crate::crypto::BCRYPT_COST,
            smtp: None,
        }
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = get_env(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = get_env("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, generating a random secret; sessions will not survive restarts");
            let bytes: [u8; 32] = rand::thread_rng().gen();
            hex::encode(bytes)
        });

        let session = SessionConfig {
            session_ttl: parse_env("SESSION_TTL_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.session.session_ttl),
            idle_timeout: parse_env("IDLE_TIMEOUT_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.session.idle_timeout),
            refresh_ttl: parse_env("REFRESH_TTL_DAYS")
                .map(Duration::days)
                .unwrap_or(defaults.session.refresh_ttl),
        };

        Self {
            port: parse_env("PORT").unwrap_or(defaults.port),
            database_path: get_env("DATABASE_PATH"),
            jwt_secret,
            session,
            sweep_interval: parse_env("SWEEP_INTERVAL_SECS")
                .map(StdDuration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            min_request_lead: parse_env("MIN_REQUEST_LEAD_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.min_request_lead),
            client_url: get_env("CLIENT_URL").unwrap_or(defaults.client_url),
            cors_origins: get_env("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            bcrypt_cost: parse_env("BCRYPT_COST").unwrap_or(defaults.bcrypt_cost),
            smtp: SmtpConfig::from_env(),
        }
    }
}
