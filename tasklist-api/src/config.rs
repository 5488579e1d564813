/// Configuration for the API server
///
/// Loaded from environment variables (and a `.env` file when present) once at
/// startup. Invalid values stop the process before it binds a port.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: `postgres://...` or `memory://` (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: signing key, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: token lifetime such as `3600`, `30m`, `12h`, `1d` (default: 1d)
/// - `API_HOST`: bind host (default: 0.0.0.0)
/// - `PORT`: bind port (default: 3000)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: *)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// # Example
///
/// ```no_run
/// use tasklist_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Listening on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use anyhow::Context;
use chrono::{Duration, Utc};

/// Shortest accepted `JWT_SECRET`
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,

    /// Lifetime of issued tokens
    pub expires_in: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

/// Parses a lifetime such as `3600`, `45s`, `30m`, `12h`, or `7d`
///
/// A bare number counts seconds.
pub fn parse_lifetime(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&value[..i], Some(c)),
        _ => (value, None),
    };

    let amount: i64 = digits
        .parse()
        .with_context(|| format!("Invalid duration '{}'", value))?;
    if amount <= 0 {
        anyhow::bail!("Duration '{}' must be positive", value);
    }

    let duration = match unit {
        None | Some('s') => Duration::try_seconds(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('h') => Duration::try_hours(amount),
        Some('d') => Duration::try_days(amount),
        Some(other) => anyhow::bail!("Unknown duration unit '{}' in '{}'", other, value),
    };

    // Tokens carry `now + lifetime` as their expiry
    match duration {
        Some(d) if Utc::now().checked_add_signed(d).is_some() => Ok(d),
        _ => anyhow::bail!("Duration '{}' is out of range", value),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(str::to_string)
        .collect()
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads and validates configuration from the environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = var_or("PORT", "3000")
            .parse::<u16>()
            .context("PORT must be a port number")?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let config = Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "*")),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret,
                expires_in: parse_lifetime(&var_or("JWT_EXPIRES_IN", "1d"))
                    .context("JWT_EXPIRES_IN is invalid")?,
            },
            log_format: var_or("LOG_FORMAT", "pretty").parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Configuration for tests: in-memory store, one-hour tokens
    pub fn for_tests(secret: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: secret.to_string(),
                expires_in: Duration::hours(1),
            },
            log_format: LogFormat::Pretty,
        }
    }
}
