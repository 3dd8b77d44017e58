use super::block::Block;
use super::crypto::Address;
use super::transaction::Transaction;

/// Computes a participant's spendable balance
///
/// Confirmed credits minus confirmed debits minus debits still waiting in the
/// open pool. Pending credits are not counted until they are mined.
pub fn balance(participant: &Address, chain: &[Block], open_transactions: &[Transaction]) -> f64 {
    let mut received = 0.0;
    let mut sent = 0.0;

    for transaction in chain.iter().flat_map(|block| block.transactions.iter()) {
        if transaction.recipient == *participant {
            received += transaction.amount;
        }
        if transaction.sender == *participant {
            sent += transaction.amount;
        }
    }

    for transaction in open_transactions {
        if transaction.sender == *participant {
            sent += transaction.amount;
        }
    }

    received - sent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sender: &str, recipient: &str, amount: f64) -> Transaction {
        Transaction::new(Address::from(sender), Address::from(recipient), amount, None)
    }

    fn chain() -> Vec<Block> {
        vec![
            Block::genesis(),
            Block::new(1, "h0".to_string(), vec![tx("MINING", "alice", 10.0)], 0),
            Block::new(
                2,
                "h1".to_string(),
                vec![tx("alice", "bob", 3.0), tx("MINING", "alice", 10.0)],
                0,
            ),
        ]
    }

    #[test]
    fn test_confirmed_balance() {
        let chain = chain();

        assert_eq!(balance(&Address::from("alice"), &chain, &[]), 17.0);
        assert_eq!(balance(&Address::from("bob"), &chain, &[]), 3.0);
        assert_eq!(balance(&Address::from("nobody"), &chain, &[]), 0.0);
    }

    #[test]
    fn test_pending_debits_count() {
        let chain = chain();
        let pool = vec![tx("alice", "carol", 5.0)];

        assert_eq!(balance(&Address::from("alice"), &chain, &pool), 12.0);
    }

    #[test]
    fn test_pending_credits_do_not_count() {
        let chain = chain();
        let pool = vec![tx("alice", "carol", 5.0)];

        assert_eq!(balance(&Address::from("carol"), &chain, &pool), 0.0);
    }

    #[test]
    fn test_self_transfer_nets_to_zero() {
        let mut chain = chain();
        chain.push(Block::new(3, "h2".to_string(), vec![tx("bob", "bob", 2.0)], 0));

        assert_eq!(balance(&Address::from("bob"), &chain, &[]), 3.0);
    }
}
