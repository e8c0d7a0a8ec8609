use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::gateway::stripe::DEFAULT_API_BASE;

/// Application-level constants
pub const APP_NAME: &str = "VidaPay";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const SECRET_KEY_VAR: &str = "STRIPE_SECRET_KEY";
const API_BASE_VAR: &str = "STRIPE_API_BASE";
const DATA_DIR_VAR: &str = "VIDAPAY_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("STRIPE_SECRET_KEY is not set; refusing to start without a payment processor credential")]
    MissingSecret,

    #[error("cannot determine home directory for the data directory; set VIDAPAY_DATA_DIR")]
    NoHomeDir,
}

/// Worker configuration, resolved once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load from the process environment. A missing processor secret is
    /// fatal; a wrong-looking one only warns, since restricted and
    /// sandbox keys vary.
    pub fn from_env() -> Result<Self, ConfigError> {
        let stripe_secret_key = env::var(SECRET_KEY_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        if !looks_like_secret_key(&stripe_secret_key) {
            tracing::warn!(
                "{SECRET_KEY_VAR} does not look like a processor secret key (expected an sk_ prefix)"
            );
        }

        let stripe_api_base =
            env::var(API_BASE_VAR).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let data_dir = match env::var(DATA_DIR_VAR) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        Ok(Self {
            stripe_secret_key,
            stripe_api_base,
            data_dir,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vidapay.db")
    }
}

/// Default data directory: ~/.vidapay
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".vidapay"))
        .ok_or(ConfigError::NoHomeDir)
}

pub fn looks_like_secret_key(key: &str) -> bool {
    key.starts_with("sk_")
}

pub fn default_log_filter() -> String {
    "info,vidapay=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_dir_under_home() {
        let dir = default_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(".vidapay"));
    }

    #[test]
    fn database_path_is_inside_data_dir() {
        let config = AppConfig {
            stripe_secret_key: "sk_test_123".into(),
            stripe_api_base: DEFAULT_API_BASE.into(),
            data_dir: PathBuf::from("/tmp/vidapay-test"),
        };
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/vidapay-test/vidapay.db")
        );
    }

    #[test]
    fn secret_key_prefix_check() {
        assert!(looks_like_secret_key("sk_test_4eC39HqLyjWDarjtT1zdp7dc"));
        assert!(looks_like_secret_key("sk_live_abc"));
        assert!(!looks_like_secret_key("pk_test_abc"));
        assert!(!looks_like_secret_key("whsec_abc"));
    }
}
