use std::{env, fmt, str::FromStr};

use anyhow::{Context, bail};
use chrono::Duration;
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub token: TokenSettings,
}

/// Signing material for access tokens. Loaded once at startup and handed to
/// [`crate::services::token_service::TokenService`].
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, algorithm: Algorithm, ttl: Duration) -> anyhow::Result<Self> {
        // Tokens are signed with a shared secret, so only the HMAC family applies.
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            bail!("unsupported token algorithm {algorithm:?}, expected HS256, HS384 or HS512");
        }
        let secret = secret.into();
        if secret.is_empty() {
            bail!("SECRET_KEY must not be empty");
        }
        if ttl < Duration::zero() {
            bail!("EXPIRES must not be negative");
        }
        Ok(Self {
            secret,
            algorithm,
            ttl,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("SECRET_KEY").context("SECRET_KEY is not set")?;
        let algorithm = match env::var("ALGORITHM") {
            Ok(name) => Algorithm::from_str(&name)
                .map_err(|_| anyhow::anyhow!("unknown token algorithm {name}"))?,
            Err(_) => Algorithm::HS256,
        };
        let ttl = env::var("EXPIRES")
            .ok()
            .map(|s| s.parse::<i64>().context("EXPIRES must be a number of seconds"))
            .transpose()?
            .unwrap_or(1800);
        Self::new(secret, algorithm, ttl_from_secs(ttl)?)
    }
}

fn ttl_from_secs(secs: i64) -> anyhow::Result<Duration> {
    Duration::try_seconds(secs).with_context(|| format!("EXPIRES={secs} is out of range"))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let token = TokenSettings::from_env()?;
        Ok(Self {
            port,
            database_url,
            host,
            token,
        })
    }
}
