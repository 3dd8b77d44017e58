use log::warn;

use super::block::Block;
use super::hashing::hash_block;
use super::proof::ProofOfWork;
use super::transaction::Transaction;

/// Verifies hash linkage and proof of work across the whole chain
///
/// The genesis block is exempt. Each later block must reference the digest of
/// its predecessor, carry the next index, and hold a proof that is valid for
/// its transactions without the trailing reward transaction.
pub fn verify_chain(chain: &[Block], pow: &ProofOfWork) -> bool {
    if chain.is_empty() {
        warn!("Chain is empty, genesis block missing");
        return false;
    }

    for (index, pair) in chain.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        let position = index + 1;

        if previous.index.checked_add(1) != Some(block.index) {
            warn!(
                "Block at position {} has index {}, previous block has index {}",
                position, block.index, previous.index
            );
            return false;
        }

        let computed_previous_hash = hash_block(previous);
        if block.previous_hash != computed_previous_hash {
            warn!(
                "Block {} references previous hash {} but block {} hashes to {}",
                block.index, block.previous_hash, previous.index, computed_previous_hash
            );
            return false;
        }

        let without_reward = match block.transactions.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        };
        if !pow.valid_proof(without_reward, &block.previous_hash, block.proof) {
            warn!("Proof of work is invalid in block {}", block.index);
            return false;
        }
    }

    true
}

/// Checks that the sender can afford the transaction
///
/// # Arguments
///
/// * `transaction` - The transaction to check
/// * `get_balance` - Returns the current balance of the transaction's sender
pub fn verify_transaction<F>(transaction: &Transaction, get_balance: F) -> bool
where
    F: Fn(&Transaction) -> f64,
{
    let sender_balance = get_balance(transaction);

    if transaction.amount > sender_balance {
        warn!(
            "Transaction amount {} higher than available funds {} of {}",
            transaction.amount, sender_balance, transaction.sender
        );
        return false;
    }

    true
}

/// Checks every transaction independently against its sender's current balance
///
/// Transactions are not applied one after another, so a set that is only
/// affordable one at a time still passes.
pub fn verify_transactions<F>(transactions: &[Transaction], get_balance: F) -> bool
where
    F: Fn(&Transaction) -> f64,
{
    transactions
        .iter()
        .all(|transaction| verify_transaction(transaction, &get_balance))
}
