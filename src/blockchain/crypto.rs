use ed25519_dalek::{Signature, SigningKey, Signer, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Malformed key material: {0}")]
    MalformedKeys(String),
}

/// Represents a participant identity (public key in base58 format)
///
/// Any string is accepted as an identity; only signature checks require it to
/// decode to a real public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let bytes = public_key.as_bytes();
        let encoded = bs58::encode(bytes).into_string();
        Address(encoded)
    }

    /// Converts the address to a public key
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        VerifyingKey::from_bytes(&bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey("Invalid public key bytes".to_string())
        })?)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

/// Represents a digital signature (base58 encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        let bytes = signature.to_bytes();
        let encoded = bs58::encode(bytes).into_string();
        DigitalSignature(encoded)
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self::from_signing_key(signing_key)
    }

    /// Creates a wallet from an existing secret key
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_array: [u8; 32] = secret_key_bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes_array)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Signs a message with the wallet's private key
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        let signature = self.signing_key.sign(message);
        DigitalSignature::from_signature(&signature)
    }

    /// Exports the wallet's secret key as bytes
    pub fn export_secret_key(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    /// Exports the keypair as two lines: base58 public key, then hex private key
    pub fn export_keys(&self) -> String {
        format!("{}\n{}", self.address, hex::encode(self.export_secret_key()))
    }

    /// Imports a keypair previously written by [`Wallet::export_keys`]
    pub fn import_keys(text: &str) -> Result<Self, CryptoError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let public = lines
            .next()
            .ok_or_else(|| CryptoError::MalformedKeys("missing public key line".to_string()))?;
        let private = lines
            .next()
            .ok_or_else(|| CryptoError::MalformedKeys("missing private key line".to_string()))?;

        let secret = hex::decode(private)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let wallet = Self::from_secret_key(&secret)?;

        if wallet.address.0 != public {
            return Err(CryptoError::MalformedKeys(
                "public key does not belong to private key".to_string(),
            ));
        }

        Ok(wallet)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders an amount the same way for signing and hashing
pub fn format_amount(amount: f64) -> String {
    format!("{:?}", amount)
}

/// Digest of the signed transfer payload: sender, recipient and amount
/// concatenated as strings, in that order.
fn transfer_digest(sender: &Address, recipient: &Address, amount: f64) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(sender.0.as_bytes());
    hasher.update(recipient.0.as_bytes());
    hasher.update(format_amount(amount).as_bytes());
    hasher.finalize().to_vec()
}

/// Signs a transfer on behalf of the wallet's owner
pub fn sign_transaction(
    wallet: &Wallet,
    sender: &Address,
    recipient: &Address,
    amount: f64,
) -> DigitalSignature {
    wallet.sign(&transfer_digest(sender, recipient, amount))
}

/// Checks a transfer signature against the public key encoded in `sender`.
///
/// Never errors: anything that fails to decode is reported as an invalid
/// signature.
pub fn verify_transaction_signature(
    signature: &DigitalSignature,
    sender: &Address,
    recipient: &Address,
    amount: f64,
) -> bool {
    let public_key = match sender.to_public_key() {
        Ok(key) => key,
        Err(_) => return false,
    };

    let message = transfer_digest(sender, recipient, amount);
    verify_signature(&message, signature, &public_key).unwrap_or(false)
}

/// Verifies a signature against a message and public key
pub fn verify_signature(
    message: &[u8],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;

    match public_key.verify(message, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();
        assert!(!wallet.address.0.is_empty());
    }

    #[test]
    fn test_signing_and_verification() {
        let wallet = Wallet::new();
        let message = b"Hello, world!";

        let signature = wallet.sign(message);

        let result = verify_signature(message, &signature, wallet.public_key()).unwrap();
        assert!(result);

        let wrong_message = b"Wrong message";
        let result = verify_signature(wrong_message, &signature, wallet.public_key()).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_transaction_signature_with_other_key() {
        let alice = Wallet::new();
        let bob = Wallet::new();
        let recipient = Address::from("carol");

        let signature = sign_transaction(&alice, alice.address(), &recipient, 12.5);

        assert!(verify_transaction_signature(&signature, alice.address(), &recipient, 12.5));
        assert!(!verify_transaction_signature(&signature, bob.address(), &recipient, 12.5));
    }

    #[test]
    fn test_transaction_signature_covers_amount_and_recipient() {
        let alice = Wallet::new();
        let recipient = Address::from("carol");
        let signature = sign_transaction(&alice, alice.address(), &recipient, 12.5);

        assert!(!verify_transaction_signature(&signature, alice.address(), &recipient, 13.0));
        assert!(!verify_transaction_signature(
            &signature,
            alice.address(),
            &Address::from("mallory"),
            12.5
        ));
    }

    #[test]
    fn test_verification_fails_closed() {
        let alice = Wallet::new();
        let recipient = Address::from("carol");
        let garbage = DigitalSignature("not-base58-0OIl".to_string());
        let signature = sign_transaction(&alice, alice.address(), &recipient, 1.0);

        assert!(!verify_transaction_signature(&garbage, alice.address(), &recipient, 1.0));
        assert!(!verify_transaction_signature(&signature, &Address::from("MINING"), &recipient, 1.0));
    }

    #[test]
    fn test_address_conversion() {
        let wallet = Wallet::new();
        let public_key = wallet.address().to_public_key().unwrap();
        assert_eq!(public_key.as_bytes(), wallet.public_key().as_bytes());
    }

    #[test]
    fn test_export_import_keys() {
        let wallet = Wallet::new();
        let exported = wallet.export_keys();

        let imported = Wallet::import_keys(&exported).unwrap();
        assert_eq!(imported.address(), wallet.address());
        assert_eq!(imported.export_secret_key(), wallet.export_secret_key());

        let other = Wallet::new();
        let mismatched = format!("{}\n{}", other.address(), hex::encode(wallet.export_secret_key()));
        assert!(Wallet::import_keys(&mismatched).is_err());
        assert!(Wallet::import_keys("only-one-line").is_err());
    }
}
