//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: Auth,

    /// [`service::Service`] configuration.
    #[serde(default)]
    pub service: service::Config,

    /// Postgres configuration.
    #[serde(default)]
    pub postgres: Postgres,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// Maximum duration of a single HTTP request handling.
    #[default(time::Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub request_timeout: time::Duration,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Authentication configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Auth {
    /// Secret the [JWT]s of principals are signed with (HS256).
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[default(SecretString::from("secret"))]
    pub jwt_secret: SecretString,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default(SecretString::from("postgres"))]
    pub password: SecretString,

    /// Database name to connect to.
    #[default("jurisflow".to_owned())]
    pub dbname: String,

    /// Maximum number of pooled connections.
    #[default(16)]
    pub pool_size: usize,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        use secrecy::ExposeSecret as _;

        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            pool_size,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password.expose_secret().to_owned()),
            dbname: Some(dbname),
            pool: Some(service::infra::postgres::PoolConfig::new(
                pool_size,
            )),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::ExposeSecret as _;

    use super::Config;

    #[test]
    fn falls_back_to_defaults() {
        let conf = Config::new("does-not-exist.toml").unwrap();

        assert_eq!(conf.server.port, 8080);
        assert_eq!(conf.server.request_timeout, Duration::from_secs(30));
        assert_eq!(conf.auth.jwt_secret.expose_secret(), "secret");
        assert_eq!(conf.service.quota.basic, Some(10));
        assert_eq!(conf.service.quota.premium, None);
        assert_eq!(conf.service.numbering.max_attempts, 3);
    }
}
