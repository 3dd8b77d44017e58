//! Node configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::transaction::TransactionError;
use crate::blockchain::{Address, ProofOfWork, Transaction};

/// Environment variable naming an optional JSON config file
pub const CONFIG_ENV: &str = "LEDGER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid mining reward in {path}: {source}")]
    MiningReward {
        path: PathBuf,
        source: TransactionError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Where ledger snapshots are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Two-line text file
    #[default]
    File,
    /// sled database directory
    Sled,
}

/// Settings that shape the ledger's consensus rules
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
    #[serde(default = "default_difficulty_prefix")]
    pub difficulty_prefix: String,
    #[serde(default)]
    pub max_proof_attempts: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_mining_reward() -> f64 {
    10.0
}

fn default_difficulty_prefix() -> String {
    crate::blockchain::proof::DEFAULT_TARGET_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mining_reward: default_mining_reward(),
            difficulty_prefix: default_difficulty_prefix(),
            max_proof_attempts: None,
        }
    }
}

impl LedgerConfig {
    /// Checks that reward transactions built from this config are valid
    pub fn validate(&self) -> Result<(), TransactionError> {
        Transaction::reward(Address::from("validator"), self.mining_reward).validate_amount()
    }

    pub fn proof_of_work(&self) -> ProofOfWork {
        ProofOfWork::new(self.difficulty_prefix.clone(), self.max_proof_attempts)
    }
}

impl Config {
    /// Reads a JSON config file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.ledger.validate().map_err(|source| ConfigError::MiningReward {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config)
    }

    /// Loads the file named by `LEDGER_CONFIG`, or the defaults when unset
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        match self.storage {
            StorageBackend::File => self.data_dir.join("blockchain.txt"),
            StorageBackend::Sled => self.data_dir.join("blockchain"),
        }
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("wallet.txt")
    }
}
