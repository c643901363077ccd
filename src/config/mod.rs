mod basic;
mod lightroom;
mod sync;

pub use basic::BasicConfig;
pub use lightroom::LightroomConfig;
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Lightroom API and OAuth settings (see `lightroom` table in config.toml).
    #[serde(default)]
    pub lightroom: LightroomConfig,

    /// Sync pipeline settings (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// `Key::from` needs 64 bytes; we derive them from a shorter secret, but refuse trivially short ones.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {}", DEFAULT_CONFIG_FILE);
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if let Err(reason) = cfg.validate() {
            panic!("{reason}");
        }
        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.basic.admin_password.trim().is_empty() {
            return Err("basic.admin_password must be set and non-empty".to_string());
        }
        if self.basic.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(format!(
                "basic.session_secret must be at least {MIN_SESSION_SECRET_LEN} characters"
            ));
        }
        if self.sync.asset_batch_size == 0 {
            return Err("sync.asset_batch_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_validation_without_secrets() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_accepts_complete_config() {
        let mut cfg = Config::default();
        cfg.basic.admin_password = "hunter2".to_string();
        cfg.basic.session_secret = "x".repeat(MIN_SESSION_SECRET_LEN);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sync.asset_batch_size, 5);
        assert_eq!(cfg.sync.rate_limit_secs, 60);
    }
}
