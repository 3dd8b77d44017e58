use log::debug;
use thiserror::Error;

use super::hashing::{canonical_transactions, hash_string_sha256};
use super::transaction::Transaction;

/// Hex prefix a proof digest must start with
pub const DEFAULT_TARGET_PREFIX: &str = "00";

/// Errors that can occur during proof search
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("No valid proof found within {0} attempts")]
    AttemptsExhausted(u64),
}

/// Proof-of-work difficulty predicate and nonce search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    /// Required hex prefix of the proof digest
    target_prefix: String,

    /// Optional cap on search attempts; `None` searches until found
    max_attempts: Option<u64>,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork {
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            max_attempts: None,
        }
    }
}

impl ProofOfWork {
    pub fn new(target_prefix: impl Into<String>, max_attempts: Option<u64>) -> Self {
        ProofOfWork {
            target_prefix: target_prefix.into(),
            max_attempts,
        }
    }

    pub fn target_prefix(&self) -> &str {
        &self.target_prefix
    }

    /// Checks whether `proof` satisfies the difficulty for the given inputs
    ///
    /// # Arguments
    ///
    /// * `transactions` - Transactions the proof covers (without the reward)
    /// * `previous_hash` - Digest of the preceding block
    /// * `proof` - Candidate nonce
    pub fn valid_proof(&self, transactions: &[Transaction], previous_hash: &str, proof: u64) -> bool {
        let guess = format!("{}{}{}", canonical_transactions(transactions), previous_hash, proof);
        let guessed_hash = hash_string_sha256(guess.as_bytes());

        guessed_hash.starts_with(&self.target_prefix)
    }

    /// Searches nonces upward from zero until one satisfies [`Self::valid_proof`]
    pub fn find_proof(&self, transactions: &[Transaction], previous_hash: &str) -> Result<u64, ProofError> {
        let mut proof = 0;

        while !self.valid_proof(transactions, previous_hash, proof) {
            proof += 1;

            if let Some(limit) = self.max_attempts {
                if proof >= limit {
                    return Err(ProofError::AttemptsExhausted(limit));
                }
            }
        }

        debug!("Found proof {} after {} attempts", proof, proof + 1);
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    fn transactions() -> Vec<Transaction> {
        vec![
            Transaction::new(Address::from("alice"), Address::from("bob"), 3.0, None),
            Transaction::new(Address::from("bob"), Address::from("carol"), 1.5, None),
        ]
    }

    #[test]
    fn test_find_then_valid_proof() {
        let pow = ProofOfWork::default();
        let txs = transactions();

        let proof = pow.find_proof(&txs, "previous").unwrap();
        assert!(pow.valid_proof(&txs, "previous", proof));
    }

    #[test]
    fn test_found_proof_is_the_first_valid_one() {
        let pow = ProofOfWork::new("0", None);
        let txs = transactions();

        let proof = pow.find_proof(&txs, "abc").unwrap();
        assert!((0..proof).all(|p| !pow.valid_proof(&txs, "abc", p)));
    }

    #[test]
    fn test_empty_prefix_accepts_zero() {
        let pow = ProofOfWork::new("", None);
        assert_eq!(pow.find_proof(&[], "").unwrap(), 0);
    }

    #[test]
    fn test_max_attempts_guard() {
        // 64 zero hex digits cannot be reached
        let pow = ProofOfWork::new("0".repeat(64), Some(50));

        match pow.find_proof(&transactions(), "previous") {
            Err(ProofError::AttemptsExhausted(limit)) => assert_eq!(limit, 50),
            other => panic!("expected exhausted search, got {:?}", other),
        }
    }
}
