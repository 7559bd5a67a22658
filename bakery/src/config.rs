//! Runtime configuration read from the environment (and `.env` via `dotenvy`).

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Upper bound for the maintenance day counts (ten years)
pub const MAX_MAINTENANCE_DAYS: i64 = 3650;
pub const MAX_SCHEDULER_TIMEOUT_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub admin_token: Option<String>,
    pub log_format: LogFormat,
    pub maintenance_interval_days: i64,
    pub maintenance_warning_days: i64,
    pub scheduler_url: Option<url::Url>,
    pub scheduler_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bakery.db?mode=rwc".into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            admin_token: None,
            log_format: LogFormat::Pretty,
            maintenance_interval_days: 90,
            maintenance_warning_days: 7,
            scheduler_url: None,
            scheduler_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but malformed.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let bind_addr = match get("BAKERY_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "BAKERY_BIND_ADDR",
                reason: e.to_string(),
            })?,
            None => defaults.bind_addr,
        };

        let log_format = match get("BAKERY_LOG_FORMAT") {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "BAKERY_LOG_FORMAT",
                    reason: format!("expected 'pretty' or 'json', got '{other}'"),
                });
            }
        };

        let scheduler_url = get("BAKERY_SCHEDULER_URL")
            .map(|raw| {
                url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                    field: "BAKERY_SCHEDULER_URL",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let config = Self {
            database_url: get("DATABASE_URL").map_or(defaults.database_url, str::to_string),
            bind_addr,
            admin_token: get("BAKERY_ADMIN_TOKEN").map(str::to_string),
            log_format,
            maintenance_interval_days: parse_days(
                get("BAKERY_MAINTENANCE_INTERVAL_DAYS"),
                "BAKERY_MAINTENANCE_INTERVAL_DAYS",
                defaults.maintenance_interval_days,
                MAX_MAINTENANCE_DAYS,
            )?,
            maintenance_warning_days: parse_days(
                get("BAKERY_MAINTENANCE_WARNING_DAYS"),
                "BAKERY_MAINTENANCE_WARNING_DAYS",
                defaults.maintenance_warning_days,
                MAX_MAINTENANCE_DAYS,
            )?,
            scheduler_url,
            scheduler_timeout: Duration::from_secs(
                parse_days(
                    get("BAKERY_SCHEDULER_TIMEOUT_SECS"),
                    "BAKERY_SCHEDULER_TIMEOUT_SECS",
                    30,
                    MAX_SCHEDULER_TIMEOUT_SECS,
                )?
                .unsigned_abs(),
            ),
            cors_origins: get("BAKERY_CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.maintenance_interval_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BAKERY_MAINTENANCE_INTERVAL_DAYS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.scheduler_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "BAKERY_SCHEDULER_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(token) = &self.admin_token
            && token.len() < 16
        {
            return Err(ConfigError::InvalidValue {
                field: "BAKERY_ADMIN_TOKEN",
                reason: "must be at least 16 characters".into(),
            });
        }
        Ok(())
    }

    /// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match self.log_format {
            LogFormat::Json => fmt().json().with_env_filter(filter).init(),
            LogFormat::Pretty => fmt().with_env_filter(filter).init(),
        }
    }
}

/// Integer in `0..=max`; used for day counts and the timeout seconds.
fn parse_days(raw: Option<&str>, field: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: i64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        field,
        reason: format!("'{raw}' is not a whole number"),
    })?;
    if value < 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be negative".into(),
        });
    }
    if value > max {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be at most {max}"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.database_url, "sqlite://bakery.db?mode=rwc");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.maintenance_interval_days, 90);
        assert_eq!(config.maintenance_warning_days, 7);
        assert_eq!(config.scheduler_timeout, Duration::from_secs(30));
        assert!(config.scheduler_url.is_none());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://bakery@localhost/bakery"),
            ("BAKERY_BIND_ADDR", "127.0.0.1:8080"),
            ("BAKERY_LOG_FORMAT", "json"),
            ("BAKERY_MAINTENANCE_INTERVAL_DAYS", "60"),
            ("BAKERY_SCHEDULER_URL", "http://scorer.internal:9000/suggest"),
            ("BAKERY_CORS_ORIGINS", "http://localhost:5173, https://dash.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.maintenance_interval_days, 60);
        assert_eq!(config.scheduler_url.unwrap().port(), Some(9000));
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_vars(&vars(&[("BAKERY_LOG_FORMAT", "xml")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_BIND_ADDR", "nowhere")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_MAINTENANCE_INTERVAL_DAYS", "-3")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_MAINTENANCE_INTERVAL_DAYS", "0")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_MAINTENANCE_INTERVAL_DAYS", "106751991167300")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_MAINTENANCE_WARNING_DAYS", "3651")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_MAINTENANCE_WARNING_DAYS", "3650")])).is_ok());
        assert!(Config::from_vars(&vars(&[("BAKERY_SCHEDULER_TIMEOUT_SECS", "86400")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_SCHEDULER_TIMEOUT_SECS", "0")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_SCHEDULER_URL", "not a url")])).is_err());
        assert!(Config::from_vars(&vars(&[("BAKERY_ADMIN_TOKEN", "short")])).is_err());
    }

    #[test]
    fn test_error_names_the_variable() {
        let err = Config::from_vars(&vars(&[("BAKERY_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(err.to_string().contains("BAKERY_LOG_FORMAT"));
    }
}
