use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sled::{Db, Tree};
use thiserror::Error;

use super::block::Block;
use super::crypto::{CryptoError, Wallet};
use super::transaction::Transaction;

/// Chain and open pool as persisted together
pub type Snapshot = (Vec<Block>, Vec<Transaction>);

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Key material error: {0}")]
    KeyError(#[from] CryptoError),

    #[error("Item not found: {0}")]
    NotFound(String),
}

/// Persists and restores the ledger state
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    fn save_snapshot(&self, chain: &[Block], open_transactions: &[Transaction]) -> Result<(), StorageError>;

    fn load_snapshot(&self) -> Result<Snapshot, StorageError>;
}

/// Snapshot kept in a two-line text file
///
/// Line one holds the chain as a JSON array of blocks, line two the open
/// transactions as a JSON array.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSnapshotStore {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save_snapshot(&self, chain: &[Block], open_transactions: &[Transaction]) -> Result<(), StorageError> {
        let chain_line = serde_json::to_string(chain)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let pool_line = serde_json::to_string(open_transactions)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, format!("{}\n{}", chain_line, pool_line))?;
        debug!("Wrote snapshot of {} blocks to {}", chain.len(), self.path.display());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Snapshot, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(format!(
                "No snapshot at {}",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path)?;
        let mut lines = content.lines();

        let chain_line = lines
            .next()
            .ok_or_else(|| StorageError::DeserializationError("Snapshot is empty".to_string()))?;
        let chain: Vec<Block> = serde_json::from_str(chain_line)
            .map_err(|e| StorageError::DeserializationError(e.to_string()))?;

        let pool_line = lines.next().ok_or_else(|| {
            StorageError::DeserializationError("Snapshot is missing open transactions".to_string())
        })?;
        let open_transactions: Vec<Transaction> = serde_json::from_str(pool_line)
            .map_err(|e| StorageError::DeserializationError(e.to_string()))?;

        Ok((chain, open_transactions))
    }
}

const CHAIN_KEY: &str = "chain";
const OPEN_TRANSACTIONS_KEY: &str = "open_transactions";

/// Snapshot kept in a sled database
pub struct SledSnapshotStore {
    /// The database instance
    db: Db,

    /// Tree holding the chain and open pool values
    ledger: Tree,
}

impl std::fmt::Debug for SledSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledSnapshotStore")
            .finish()
    }
}

impl SledSnapshotStore {
    /// Opens (or creates) the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let ledger = db.open_tree("ledger")?;

        Ok(Self { db, ledger })
    }

    /// Flushes all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl SnapshotStore for SledSnapshotStore {
    fn save_snapshot(&self, chain: &[Block], open_transactions: &[Transaction]) -> Result<(), StorageError> {
        let chain_bytes = bincode::serialize(chain)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let pool_bytes = bincode::serialize(open_transactions)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        self.ledger.insert(CHAIN_KEY, chain_bytes)?;
        self.ledger.insert(OPEN_TRANSACTIONS_KEY, pool_bytes)?;
        self.flush()
    }

    fn load_snapshot(&self) -> Result<Snapshot, StorageError> {
        let chain = match self.ledger.get(CHAIN_KEY)? {
            Some(value) => bincode::deserialize::<Vec<Block>>(&value)
                .map_err(|e| StorageError::DeserializationError(e.to_string()))?,
            None => return Err(StorageError::NotFound("No chain in storage".to_string())),
        };

        let open_transactions = match self.ledger.get(OPEN_TRANSACTIONS_KEY)? {
            Some(value) => bincode::deserialize::<Vec<Transaction>>(&value)
                .map_err(|e| StorageError::DeserializationError(e.to_string()))?,
            None => {
                warn!("Chain found without open transactions, starting with an empty pool");
                Vec::new()
            }
        };

        Ok((chain, open_transactions))
    }
}

/// Writes the wallet's keys to `path` in the exported two-line format
pub fn save_keys<P: AsRef<Path>>(path: P, wallet: &Wallet) -> Result<(), StorageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, wallet.export_keys())?;
    Ok(())
}

/// Reads a wallet previously written by [`save_keys`]
pub fn load_keys<P: AsRef<Path>>(path: P) -> Result<Wallet, StorageError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StorageError::NotFound(format!("No key file at {}", path.display())));
    }

    let text = fs::read_to_string(path)?;
    Ok(Wallet::import_keys(&text)?)
}
