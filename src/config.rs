use std::{env, fmt::Display, str::FromStr, time::Duration};

use derive_more::Display;
use log::{info, warn};
use uuid::Uuid;

#[derive(Debug, Display, PartialEq)]
pub enum ConfigError {
    #[display(fmt = "{} is required when STORE_BACKEND=postgres", _0)]
    Missing(&'static str),

    #[display(fmt = "invalid {}: {}", _0, _1)]
    Invalid(&'static str, String),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{other}', expected postgres or memory")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub session_secret: String,
    pub session_secure: bool,
    pub stripe_secret_key: Option<String>,
    pub emailjs: Option<EmailJsConfig>,
    pub seed_demo_data: bool,
    pub demo_admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset and empty keys fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: StoreBackend = parse_or(&get, "STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = get("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let session_secret = get("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, sessions will not survive a restart");
            Uuid::new_v4().simple().to_string()
        });

        let emailjs = match (get("EMAILJS_SERVICE_ID"), get("EMAILJS_TEMPLATE_ID"), get("EMAILJS_PUBLIC_KEY")) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(EmailJsConfig {
                service_id,
                template_id,
                public_key,
            }),
            _ => None,
        };

        Ok(Config {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&get, "PORT", 8080)?,
            backend,
            database_url,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5)?,
            store_timeout: Duration::from_secs(parse_or(&get, "STORE_TIMEOUT_SECS", 5)?),
            session_secret,
            session_secure: parse_or(&get, "SESSION_SECURE", false)?,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            emailjs,
            seed_demo_data: parse_or(&get, "SEED_DEMO_DATA", false)?,
            demo_admin_password: get("DEMO_ADMIN_PASSWORD").unwrap_or_else(|| "changeme".to_string()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string())),
        None => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}
