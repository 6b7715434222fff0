use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub auth: AuthConfig,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub max_body_size: usize,
    pub rate_limit: RateLimitConfig,
    pub default_duration_minutes: i64,
    pub cache_ttl_secs: u64,
}

/// Settings for validating tokens issued by the external identity provider.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub key: SigningKey,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SigningKey {
    /// HS256 shared secret.
    Secret(String),
    /// RS256 public key in PEM form.
    RsaPublicPem(String),
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let redis_url = env_optional("REDIS_URL");

        let key = match (
            env_optional("AUTH_JWT_SECRET"),
            env_optional("AUTH_JWT_PUBLIC_KEY"),
        ) {
            (_, Some(pem)) => SigningKey::RsaPublicPem(pem),
            (Some(secret), None) => SigningKey::Secret(secret),
            (None, None) => {
                return Err(
                    "Missing required environment variable: AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY"
                        .to_string(),
                );
            }
        };

        let auth = AuthConfig {
            key,
            issuer: env_optional("AUTH_ISSUER"),
            audience: env_optional("AUTH_AUDIENCE"),
        };

        let host: IpAddr = parse_var("BOOKING_HOST", "0.0.0.0")?;
        let port: u16 = parse_var("BOOKING_PORT", "8080")?;
        let log_level = env_or("BOOKING_LOG_LEVEL", "info");
        let max_body_size: usize = parse_var("BOOKING_MAX_BODY_SIZE", "65536")?;

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            limit: require_positive(
                "BOOKING_RATE_LIMIT",
                parse_var("BOOKING_RATE_LIMIT", &defaults.limit.to_string())?,
            )?,
            window_secs: require_positive(
                "BOOKING_RATE_WINDOW_SECS",
                parse_var("BOOKING_RATE_WINDOW_SECS", &defaults.window_secs.to_string())?,
            )?,
        };

        let default_duration_minutes: i64 = require_positive(
            "BOOKING_DEFAULT_DURATION_MINUTES",
            parse_var("BOOKING_DEFAULT_DURATION_MINUTES", "60")?,
        )?;

        // Redis refuses a zero expiry, which would turn every cache write into an error.
        let cache_ttl_secs: u64 = require_positive(
            "BOOKING_CACHE_TTL_SECS",
            parse_var("BOOKING_CACHE_TTL_SECS", "300")?,
        )?;

        Ok(Config {
            database_url,
            redis_url,
            auth,
            host,
            port,
            log_level,
            max_body_size,
            rate_limit,
            default_duration_minutes,
            cache_ttl_secs,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    env_optional(key).ok_or_else(|| format!("Missing required environment variable: {key}"))
}

/// Unset and blank values are treated the same.
fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &env_or(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}

fn require_positive<T>(key: &str, value: T) -> Result<T, String>
where
    T: PartialOrd + Default,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(format!("{key} must be positive"))
    }
}
