// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block and transaction structures
// - Canonical hashing
// - Keys and transaction signatures
// - Proof of work
// - Chain verification and balances
// - Snapshot persistence

pub mod balance;
pub mod block;
pub mod chain;
pub mod crypto;
pub mod hashing;
pub mod proof;
pub mod storage;
pub mod transaction;
pub mod verification;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Ledger, LedgerError};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use proof::ProofOfWork;
pub use storage::{FileSnapshotStore, SledSnapshotStore, SnapshotStore};
pub use transaction::Transaction;
