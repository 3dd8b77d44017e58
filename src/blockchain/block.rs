use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::hashing;
use super::transaction::Transaction;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Index of the block in the chain
    pub index: u64,

    /// Hash of the previous block (empty for the genesis block)
    pub previous_hash: String,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work (nonce)
    pub proof: u64,

    /// Unix timestamp (seconds) when the block was created
    pub timestamp: i64,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `previous_hash` - The hash of the previous block
    /// * `transactions` - The list of transactions to include in the block
    /// * `proof` - The proof of work (nonce)
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>, proof: u64) -> Self {
        Block {
            index,
            previous_hash,
            transactions,
            proof,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// The first block of every chain
    ///
    /// Every field is fixed so independent processes agree on its digest.
    pub fn genesis() -> Self {
        Block {
            index: 0,
            previous_hash: String::new(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            timestamp: 0,
        }
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        hashing::hash_block(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    #[test]
    fn test_new_block() {
        let transactions = vec![
            Transaction::reward(Address("recipient1".to_string()), 10.0),
            Transaction::reward(Address("recipient2".to_string()), 20.0),
        ];

        let block = Block::new(1, "previous_hash".to_string(), transactions, 100);

        assert_eq!(block.index, 1);
        assert_eq!(block.proof, 100);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.transactions.len(), 2);
        assert!(block.timestamp > 0);
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "");
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.calculate_hash(), Block::genesis().calculate_hash());
    }

    #[test]
    fn test_calculate_hash() {
        let transactions = vec![Transaction::reward(Address("recipient".to_string()), 10.0)];

        let block = Block::new(1, "previous_hash".to_string(), transactions, 100);

        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64); // SHA-256 hash is 64 characters in hex
    }
}
