use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Names a TOML file to load instead of `./ledger.toml`.
pub const CONFIG_PATH_ENV: &str = "LEDGER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

const DATA_DIR_ENV: &str = "LEDGER_DATA_DIR";
const WALLET_FILE_ENV: &str = "LEDGER_WALLET_FILE";
const LOG_LEVEL_ENV: &str = "LEDGER_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of the block store.
    pub data_dir: PathBuf,
    pub wallet_file: PathBuf,
    /// `env_logger` filter, e.g. `info` or `utxo_ledger=debug`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data/blocks"),
            wallet_file: PathBuf::from("./data/wallets.dat"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Config> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                debug!("Loading configuration from {path}");
                Config::from_file(path)?
            }
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                debug!("Loading configuration from {DEFAULT_CONFIG_FILE}");
                Config::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply `LEDGER_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(data_dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(wallet_file) = lookup(WALLET_FILE_ENV) {
            self.wallet_file = PathBuf::from(wallet_file);
        }
        if let Some(log_level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = log_level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("./data/blocks"));
        assert_eq!(config.wallet_file, PathBuf::from("./data/wallets.dat"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("data_dir = \"/var/lib/ledger\"\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/ledger"));
        assert_eq!(config.wallet_file, Config::default().wallet_file);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        match Config::from_toml_str("data_dir = [") {
            Err(LedgerError::Config(_)) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = Config::from_toml_str(
            "data_dir = \"from-file\"\nwallet_file = \"w.dat\"\nlog_level = \"warn\"\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("LEDGER_DATA_DIR", "from-env"), ("LEDGER_LOG", "")]
            .into_iter()
            .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("from-env"));
        assert_eq!(config.wallet_file, PathBuf::from("w.dat"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "log_level = \"debug\"\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().log_level, "debug");
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(LedgerError::Io(_))
        ));
    }
}
