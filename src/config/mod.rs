use chrono::Duration;
use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/eventdesk";
const DEFAULT_JWT_SECRET: &str = "eventdesk-development-secret-change-me";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub production: bool,
    pub jwt: JwtConfig,
    pub popular_cache_ttl: Duration,
    pub ticket_unit_price: Decimal,
    pub allowed_origins: Vec<String>,
    pub admin: Option<AdminSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            store_backend: StoreBackend::Postgres,
            max_connections: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            production: false,
            jwt: JwtConfig {
                secret: DEFAULT_JWT_SECRET.to_string(),
                issuer: "eventdesk".to_string(),
                audience: "eventdesk-clients".to_string(),
                ttl: Duration::minutes(60),
            },
            popular_cache_ttl: Duration::seconds(120),
            ticket_unit_price: Decimal::new(100, 0),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            admin: None,
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let production = var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let store_backend = parse_var::<StoreBackend>("STORE_BACKEND")?
            .unwrap_or(defaults.store_backend);

        let host = var("HOST").unwrap_or_else(|| defaults.bind_addr.ip().to_string());
        let port = parse_var::<u16>("PORT")?.unwrap_or(defaults.bind_addr.port());
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                value: host.clone(),
            })?;

        let secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                defaults.jwt.secret.clone()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
            audience: var("JWT_AUDIENCE").unwrap_or(defaults.jwt.audience),
            ttl: parse_var::<i64>("JWT_TTL_MINUTES")?
                .map(Duration::minutes)
                .unwrap_or(defaults.jwt.ttl),
        };

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: var("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            store_backend,
            max_connections: parse_var::<u32>("DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            bind_addr,
            production,
            jwt,
            popular_cache_ttl: parse_var::<i64>("POPULAR_CACHE_TTL_SECS")?
                .map(Duration::seconds)
                .unwrap_or(defaults.popular_cache_ttl),
            ticket_unit_price: parse_var::<rust_decimal::Decimal>("TICKET_UNIT_PRICE")?
                .unwrap_or(defaults.ticket_unit_price),
            allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or(defaults.allowed_origins),
            admin,
        })
    }
}
