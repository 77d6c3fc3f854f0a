//! Configuration module for gophermart-server.
//!
//! Settings come from three places. Command line flags and their environment
//! variables (`RUN_ADDRESS`, `DATABASE_URI`, `ACCRUAL_SYSTEM_ADDRESS`) carry
//! the deployment specifics; the optional TOML file tunes the engine and the
//! session tokens.

pub mod file;

use crate::config::file::FileConfig;
use gophermart_core::config::EngineConfig;
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid accrual system address: {0}")]
    InvalidAccrualAddress(#[from] url::ParseError),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values taken from the command line (or the matching env variables).
#[derive(Debug, Clone)]
pub struct CliSettings {
    pub run_address: String,
    pub database_uri: Option<String>,
    pub accrual_address: String,
    pub skip_migrations: bool,
}

/// Fully resolved configuration of one server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub run_address: String,
    pub database_uri: Option<String>,
    pub accrual_address: Url,
    pub run_migrations: bool,
    pub engine: EngineConfig,
    pub session_secret: Vec<u8>,
    pub session_ttl: time::Duration,
}

const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
const MAX_SESSION_TTL_HOURS: u64 = 24 * 366;

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
        }
    }

    /// Read the file (if any), merge it with the command line and validate.
    pub fn load(&self, cli: CliSettings) -> Result<ServerConfig, ConfigError> {
        let file_config = match &self.config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };
        build(cli, file_config)
    }
}

fn build(cli: CliSettings, file_config: FileConfig) -> Result<ServerConfig, ConfigError> {
    let engine = engine_config(&file_config)?;
    let accrual_address = parse_accrual_address(&cli.accrual_address)?;

    let in_memory = cli.database_uri.as_deref().is_none_or(str::is_empty);
    let session_secret = match file_config.session.secret {
        Some(secret) if !secret.is_empty() && in_memory => {
            // User ids restart from 1 with the in-memory store, so tokens of
            // a previous process must not verify.
            let mut secret = secret.into_bytes();
            let mut nonce = [0u8; 16];
            rand::rng().fill_bytes(&mut nonce);
            secret.extend_from_slice(&nonce);
            tracing::info!("In-memory store in use, sessions end on restart");
            secret
        }
        Some(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            tracing::warn!(
                "No session secret configured, using a random key; sessions end on restart"
            );
            let mut secret = vec![0u8; 32];
            rand::rng().fill_bytes(&mut secret);
            secret
        }
    };
    let ttl_hours = file_config
        .session
        .ttl_hours
        .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
    if ttl_hours == 0 || ttl_hours > MAX_SESSION_TTL_HOURS {
        return Err(ConfigError::ValidationError(format!(
            "session.ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}"
        )));
    }

    Ok(ServerConfig {
        run_address: cli.run_address,
        database_uri: cli.database_uri.filter(|uri| !uri.is_empty()),
        accrual_address,
        run_migrations: !cli.skip_migrations,
        engine,
        session_secret,
        session_ttl: time::Duration::hours(ttl_hours as i64),
    })
}

fn engine_config(file_config: &FileConfig) -> Result<EngineConfig, ConfigError> {
    let section = &file_config.engine;
    let defaults = EngineConfig::default();
    let config = EngineConfig {
        workers: section.workers.unwrap_or(defaults.workers),
        poll_interval: section
            .poll_interval_secs
            .map_or(defaults.poll_interval, Duration::from_secs),
        rate_limit_pause: section
            .rate_limit_pause_secs
            .map_or(defaults.rate_limit_pause, Duration::from_secs),
        max_rate_limit_pause: section
            .max_rate_limit_pause_secs
            .map_or(defaults.max_rate_limit_pause, Duration::from_secs),
        queue_capacity: section.queue_capacity.unwrap_or(defaults.queue_capacity),
        batch_size: section.batch_size.unwrap_or(defaults.batch_size),
        request_timeout: section
            .request_timeout_secs
            .map_or(defaults.request_timeout, Duration::from_secs),
    };

    for (name, value) in [
        ("engine.workers", config.workers),
        ("engine.queue_capacity", config.queue_capacity),
        ("engine.batch_size", config.batch_size),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{name} must be positive")));
        }
    }
    if config.poll_interval.is_zero() {
        return Err(ConfigError::ValidationError(
            "engine.poll_interval_secs must be positive".into(),
        ));
    }
    if config.request_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "engine.request_timeout_secs must be positive".into(),
        ));
    }
    if config.max_rate_limit_pause < config.rate_limit_pause {
        return Err(ConfigError::ValidationError(
            "engine.max_rate_limit_pause_secs is below engine.rate_limit_pause_secs".into(),
        ));
    }
    Ok(config)
}

/// Accept `host:port` as well as a full URL; a bare address means plain HTTP.
pub fn parse_accrual_address(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::ValidationError(
            "accrual system address is empty".into(),
        ));
    }
    let url = if raw.contains("://") {
        Url::parse(raw)?
    } else {
        Url::parse(&format!("http://{raw}"))?
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "accrual system address must be http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::{EngineSection, SessionSection};

    fn cli() -> CliSettings {
        CliSettings {
            run_address: "127.0.0.1:8080".into(),
            database_uri: None,
            accrual_address: "localhost:8081".into(),
            skip_migrations: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = build(cli(), FileConfig::default()).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.accrual_address.as_str(), "http://localhost:8081/");
        assert_eq!(config.session_secret.len(), 32);
        assert_eq!(config.session_ttl, time::Duration::hours(24));
        assert!(config.run_migrations);
        assert!(config.database_uri.is_none());
    }

    #[test]
    fn test_file_overrides_engine_and_session() {
        let file_config = FileConfig {
            engine: EngineSection {
                workers: Some(3),
                poll_interval_secs: Some(9),
                ..EngineSection::default()
            },
            session: SessionSection {
                secret: Some("s3cret".into()),
                ttl_hours: Some(1),
            },
        };
        let cli = CliSettings {
            database_uri: Some("postgres://localhost/gophermart".into()),
            ..cli()
        };
        let config = build(cli, file_config).unwrap();
        assert_eq!(config.engine.workers, 3);
        assert_eq!(config.engine.poll_interval, Duration::from_secs(9));
        assert_eq!(config.engine.batch_size, EngineConfig::default().batch_size);
        assert_eq!(config.session_secret, b"s3cret".to_vec());
        assert_eq!(config.session_ttl, time::Duration::hours(1));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        for section in [
            EngineSection {
                workers: Some(0),
                ..EngineSection::default()
            },
            EngineSection {
                queue_capacity: Some(0),
                ..EngineSection::default()
            },
            EngineSection {
                batch_size: Some(0),
                ..EngineSection::default()
            },
        ] {
            let file_config = FileConfig {
                engine: section,
                ..FileConfig::default()
            };
            assert!(matches!(
                build(cli(), file_config),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_session_lifetime_is_bounded() {
        for ttl_hours in [0, MAX_SESSION_TTL_HOURS + 1, 100_000_000, u64::MAX] {
            let file_config = FileConfig {
                session: SessionSection {
                    secret: None,
                    ttl_hours: Some(ttl_hours),
                },
                ..FileConfig::default()
            };
            assert!(
                matches!(build(cli(), file_config), Err(ConfigError::ValidationError(_))),
                "ttl_hours = {ttl_hours}"
            );
        }

        let file_config = FileConfig {
            session: SessionSection {
                secret: None,
                ttl_hours: Some(MAX_SESSION_TTL_HOURS),
            },
            ..FileConfig::default()
        };
        let config = build(cli(), file_config).unwrap();
        let sessions = gophermart_sdk::session::SessionKey::new(&config.session_secret, config.session_ttl);
        let token = sessions.issue(1).unwrap();
        assert_eq!(sessions.verify(&token).unwrap().user_id, 1);
    }

    #[test]
    fn test_in_memory_sessions_do_not_survive_a_restart() {
        let file_config = || FileConfig {
            session: SessionSection {
                secret: Some("s3cret".into()),
                ttl_hours: None,
            },
            ..FileConfig::default()
        };
        let first = build(cli(), file_config()).unwrap();
        let second = build(cli(), file_config()).unwrap();
        assert!(first.session_secret.starts_with(b"s3cret"));
        assert_ne!(first.session_secret, second.session_secret);

        let old = gophermart_sdk::session::SessionKey::new(&first.session_secret, first.session_ttl);
        let new = gophermart_sdk::session::SessionKey::new(&second.session_secret, second.session_ttl);
        let token = old.issue(1).unwrap();
        assert!(new.verify(&token).is_err());
    }

    #[test]
    fn test_accrual_address_forms() {
        assert_eq!(
            parse_accrual_address("http://accrual:8081").unwrap().as_str(),
            "http://accrual:8081/"
        );
        assert_eq!(
            parse_accrual_address("accrual:8081/base").unwrap().as_str(),
            "http://accrual:8081/base"
        );
        assert!(parse_accrual_address("").is_err());
        assert!(parse_accrual_address("ftp://accrual").is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let loader = ConfigLoader::new(Some("/nonexistent/gophermart.toml"));
        assert!(matches!(loader.load(cli()), Err(ConfigError::IoError(_))));
    }
}
