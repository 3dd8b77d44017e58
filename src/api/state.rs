use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use log::info;

use crate::blockchain::storage::{self, StorageError};
use crate::blockchain::{Ledger, SnapshotStore, Wallet};
use crate::config::LedgerConfig;

/// The node's wallet together with the ledger it mines for
#[derive(Debug, Clone)]
pub struct Node {
    pub wallet: Wallet,
    pub ledger: Ledger,
}

/// Shared application state handed to every handler
///
/// There is exactly one ledger per process. Switching wallets only changes
/// who is credited with mining rewards.
#[derive(Debug)]
pub struct AppState {
    wallet: RwLock<Wallet>,
    ledger: Ledger,
    key_path: PathBuf,
}

impl AppState {
    pub fn new(
        wallet: Wallet,
        ledger_config: LedgerConfig,
        store: Arc<dyn SnapshotStore>,
        key_path: PathBuf,
    ) -> Self {
        let ledger = Ledger::with_store(wallet.address().clone(), &ledger_config, store);

        AppState {
            wallet: RwLock::new(wallet),
            ledger,
            key_path,
        }
    }

    /// Returns a handle to the current wallet and ledger
    ///
    /// The ledger handle shares state with the node, so it stays usable after
    /// the lock is released.
    pub fn node(&self) -> Node {
        let wallet = self.wallet.read().unwrap_or_else(PoisonError::into_inner);

        Node {
            wallet: wallet.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Switches the node to `wallet`; chain and pool stay as they are
    fn switch_wallet(&self, wallet: Wallet) -> Node {
        let mut current = self.wallet.write().unwrap_or_else(PoisonError::into_inner);
        self.ledger.set_hosting_node(wallet.address().clone());
        *current = wallet;

        info!("Node now mining for {}", current.address());
        Node {
            wallet: current.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Creates fresh keys, saves them and makes them the node's identity
    pub fn create_wallet(&self) -> Result<Node, StorageError> {
        let wallet = Wallet::new();
        storage::save_keys(&self.key_path, &wallet)?;
        Ok(self.switch_wallet(wallet))
    }

    /// Loads the saved keys and makes them the node's identity
    pub fn load_wallet(&self) -> Result<Node, StorageError> {
        let wallet = storage::load_keys(&self.key_path)?;
        Ok(self.switch_wallet(wallet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::FileSnapshotStore;

    fn state_in(dir: &tempfile::TempDir) -> (AppState, Arc<dyn SnapshotStore>) {
        let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(dir.path().join("chain.txt")));
        let state = AppState::new(
            Wallet::new(),
            LedgerConfig::default(),
            store.clone(),
            dir.path().join("wallet.txt"),
        );
        (state, store)
    }

    #[test]
    fn test_switching_wallet_keeps_blocks_from_earlier_handles() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = state_in(&dir);
        let earlier = state.node().ledger;

        let switched = state.create_wallet().unwrap();
        earlier.mine().unwrap();
        switched.ledger.mine().unwrap();

        let (stored_chain, _) = store.load_snapshot().unwrap();
        assert_eq!(stored_chain.len(), 3);
        assert_eq!(state.node().ledger.get_chain(), stored_chain);
        assert!(state.node().ledger.verify_chain());

        // Both blocks were mined after the switch, so both rewards go to the new wallet
        assert_eq!(state.node().ledger.hosting_node(), *switched.wallet.address());
        assert_eq!(state.node().ledger.hosting_balance(), 20.0);
    }

    #[test]
    fn test_switching_wallet_keeps_unsaved_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state_in(&dir);
        let first = state.node().wallet;
        state.node().ledger.mine().unwrap();

        // Later saves fail; the in-memory chain is still authoritative
        std::fs::remove_file(dir.path().join("chain.txt")).unwrap();
        std::fs::create_dir(dir.path().join("chain.txt")).unwrap();
        state.node().ledger.mine().unwrap();

        state.create_wallet().unwrap();
        let ledger = state.node().ledger;

        assert_eq!(ledger.get_chain().len(), 3);
        assert_eq!(ledger.balance(first.address()), 20.0);
        assert_eq!(ledger.hosting_balance(), 0.0);
    }

    #[test]
    fn test_load_wallet_restores_saved_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state_in(&dir);

        let created = state.create_wallet().unwrap();
        state.node().ledger.mine().unwrap();
        let loaded = state.load_wallet().unwrap();

        assert_eq!(loaded.wallet.address(), created.wallet.address());
        assert_eq!(loaded.ledger.get_chain().len(), 2);
        assert_eq!(loaded.ledger.hosting_balance(), 10.0);
    }
}
