//! TOML file configuration structures.
//!
//! Every field is optional; anything left out keeps its built-in default.
//!
//! ```toml
//! [engine]
//! workers = 10
//! poll_interval_secs = 2
//!
//! [session]
//! secret = "change-me"
//! ttl_hours = 24
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// Accrual refresh engine section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub workers: Option<usize>,
    pub poll_interval_secs: Option<u64>,
    pub rate_limit_pause_secs: Option<u64>,
    pub max_rate_limit_pause_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub batch_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// Session token section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    /// HMAC key for session tokens. Without one, a random key is generated
    /// at startup and tokens do not survive a restart.
    pub secret: Option<String>,
    pub ttl_hours: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[engine]
workers = 4
poll_interval_secs = 5
rate_limit_pause_secs = 3
max_rate_limit_pause_secs = 30
queue_capacity = 128
batch_size = 16
request_timeout_secs = 7

[session]
secret = "test-secret"
ttl_hours = 12
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.workers, Some(4));
        assert_eq!(config.engine.poll_interval_secs, Some(5));
        assert_eq!(config.engine.batch_size, Some(16));
        assert_eq!(config.session.secret.as_deref(), Some("test-secret"));
        assert_eq!(config.session.ttl_hours, Some(12));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let toml_str = r#"
[engine]
worker = 4
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
