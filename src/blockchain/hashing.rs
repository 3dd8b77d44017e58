//! Canonical serialization and SHA-256 digests.
//!
//! Digests of past blocks are recomputed during chain verification, so the
//! byte layout produced here must never depend on anything but field values.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::block::Block;
use super::transaction::Transaction;

/// Block fields in lexicographic key order.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: i64,
    transactions: &'a [Transaction],
}

/// Returns the SHA-256 hash of the input as a hexadecimal string
pub fn hash_string_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Renders transactions as a JSON array, each one in its canonical field order
pub fn canonical_transactions(transactions: &[Transaction]) -> String {
    // Plain structs of strings and numbers always serialize
    serde_json::to_string(transactions).unwrap_or_default()
}

/// Computes the digest of a block
pub fn hash_block(block: &Block) -> String {
    let canonical = CanonicalBlock {
        index: block.index,
        previous_hash: &block.previous_hash,
        proof: block.proof,
        timestamp: block.timestamp,
        transactions: &block.transactions,
    };

    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    hash_string_sha256(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    fn sample_block() -> Block {
        Block {
            index: 1,
            previous_hash: "abc".to_string(),
            transactions: vec![Transaction::reward(Address::from("miner"), 10.0)],
            proof: 42,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_hash_string_sha256() {
        assert_eq!(
            hash_string_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_block_is_deterministic() {
        let block = sample_block();
        let copy = block.clone();

        let hash = hash_block(&block);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_block(&copy));
    }

    #[test]
    fn test_hash_block_covers_every_field() {
        let base = hash_block(&sample_block());

        let mut block = sample_block();
        block.proof += 1;
        assert_ne!(base, hash_block(&block));

        let mut block = sample_block();
        block.timestamp += 1;
        assert_ne!(base, hash_block(&block));

        let mut block = sample_block();
        block.previous_hash.push('0');
        assert_ne!(base, hash_block(&block));

        let mut block = sample_block();
        block.transactions[0].amount = 11.0;
        assert_ne!(base, hash_block(&block));
    }

    #[test]
    fn test_transaction_order_changes_digest() {
        let a = Transaction::reward(Address::from("a"), 1.0);
        let b = Transaction::reward(Address::from("b"), 1.0);

        assert_ne!(
            canonical_transactions(&[a.clone(), b.clone()]),
            canonical_transactions(&[b, a])
        );
    }

    #[test]
    fn test_canonical_block_layout() {
        let block = Block {
            index: 0,
            previous_hash: String::new(),
            transactions: Vec::new(),
            proof: 100,
            timestamp: 0,
        };
        let canonical = CanonicalBlock {
            index: block.index,
            previous_hash: &block.previous_hash,
            proof: block.proof,
            timestamp: block.timestamp,
            transactions: &block.transactions,
        };

        assert_eq!(
            serde_json::to_string(&canonical).unwrap(),
            r#"{"index":0,"previous_hash":"","proof":100,"timestamp":0,"transactions":[]}"#
        );
    }
}
