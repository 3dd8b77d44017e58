use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{self, Address, DigitalSignature, Wallet};

/// Sender identity used for system-issued mining rewards
pub const MINING_SENDER: &str = "MINING";

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Represents a transfer between two participants
///
/// Field order is the canonical serialization order (sender, recipient,
/// amount, signature) and feeds every digest computed over transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Digital signature over sender, recipient and amount
    #[serde(default)]
    pub signature: Option<DigitalSignature>,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    /// * `signature` - The sender's signature, if any
    pub fn new(
        sender: Address,
        recipient: Address,
        amount: f64,
        signature: Option<DigitalSignature>,
    ) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
            signature,
        }
    }

    /// Creates a transaction signed by the wallet's owner
    pub fn signed(wallet: &Wallet, recipient: Address, amount: f64) -> Self {
        let sender = wallet.address().clone();
        let signature = crypto::sign_transaction(wallet, &sender, &recipient, amount);
        Transaction::new(sender, recipient, amount, Some(signature))
    }

    /// Creates a mining reward transaction
    ///
    /// # Arguments
    ///
    /// * `recipient` - The address of the miner
    /// * `amount` - The reward amount
    pub fn reward(recipient: Address, amount: f64) -> Self {
        Transaction::new(Address(MINING_SENDER.to_string()), recipient, amount, None)
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.0 == MINING_SENDER
    }

    /// Verifies the transaction's signature
    ///
    /// Rewards need no signature. A missing or undecodable signature on any
    /// other transaction is reported as invalid.
    pub fn verify_signature(&self) -> bool {
        if self.is_reward() {
            return true;
        }

        match &self.signature {
            Some(signature) => crypto::verify_transaction_signature(
                signature,
                &self.sender,
                &self.recipient,
                self.amount,
            ),
            None => false,
        }
    }

    /// Rejects negative and non-finite amounts
    pub fn validate_amount(&self) -> Result<(), TransactionError> {
        if !self.amount.is_finite() {
            return Err(TransactionError::InvalidAmount(format!(
                "{} is not a finite number",
                self.amount
            )));
        }

        if self.amount < 0.0 {
            return Err(TransactionError::InvalidAmount(format!(
                "{} is negative",
                self.amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_transaction() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        let transaction = Transaction::signed(&sender_wallet, recipient_wallet.address().clone(), 10.5);

        assert_eq!(transaction.sender, *sender_wallet.address());
        assert_eq!(transaction.recipient, *recipient_wallet.address());
        assert_eq!(transaction.amount, 10.5);
        assert!(transaction.signature.is_some());
        assert!(transaction.verify_signature());
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let sender_wallet = Wallet::new();
        let mut transaction = Transaction::signed(&sender_wallet, Address::from("bob"), 10.0);

        transaction.amount = 1000.0;
        assert!(!transaction.verify_signature());
    }

    #[test]
    fn test_unsigned_transaction_is_invalid() {
        let sender_wallet = Wallet::new();
        let transaction = Transaction::new(
            sender_wallet.address().clone(),
            Address::from("bob"),
            1.0,
            None,
        );

        assert!(!transaction.verify_signature());
    }

    #[test]
    fn test_reward_transaction() {
        let miner_wallet = Wallet::new();
        let transaction = Transaction::reward(miner_wallet.address().clone(), 10.0);

        assert_eq!(transaction.sender.0, MINING_SENDER);
        assert_eq!(transaction.recipient, *miner_wallet.address());
        assert_eq!(transaction.amount, 10.0);
        assert!(transaction.signature.is_none());
        assert!(transaction.is_reward());
        assert!(transaction.verify_signature());
    }

    #[test]
    fn test_validate_amount() {
        let tx = |amount| Transaction::new(Address::from("a"), Address::from("b"), amount, None);

        assert!(tx(0.0).validate_amount().is_ok());
        assert!(tx(5.0).validate_amount().is_ok());
        assert!(tx(-1.0).validate_amount().is_err());
        assert!(tx(f64::NAN).validate_amount().is_err());
        assert!(tx(f64::INFINITY).validate_amount().is_err());
    }

    #[test]
    fn test_serialized_field_order() {
        let transaction = Transaction::reward(Address::from("miner"), 10.0);
        let json = serde_json::to_string(&transaction).unwrap();

        assert_eq!(
            json,
            r#"{"sender":"MINING","recipient":"miner","amount":10.0,"signature":null}"#
        );
    }
}
