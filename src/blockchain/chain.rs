use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{error, info, warn};
use thiserror::Error;

use crate::config::LedgerConfig;

use super::balance;
use super::block::Block;
use super::crypto::{Address, DigitalSignature};
use super::hashing::hash_block;
use super::proof::{ProofError, ProofOfWork};
use super::storage::{SnapshotStore, StorageError};
use super::transaction::{Transaction, TransactionError};
use super::verification;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Transaction rejected: {0}")]
    RejectedTransaction(String),

    #[error("Signature verification failed for transaction from {0}")]
    SignatureVerificationFailure(Address),

    #[error("Chain failed verification, ledger is halted")]
    ChainInvalid,

    #[error("Chain tip changed while mining")]
    StaleChain,

    #[error("Proof of work error: {0}")]
    Proof(#[from] ProofError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<TransactionError> for LedgerError {
    fn from(err: TransactionError) -> Self {
        LedgerError::RejectedTransaction(err.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The local ledger: an append-only chain plus the pool of unmined transactions
#[derive(Debug, Clone)]
pub struct Ledger {
    /// The chain of blocks
    chain: Arc<Mutex<Vec<Block>>>,

    /// Transactions accepted but not yet mined
    open_transactions: Arc<Mutex<Vec<Transaction>>>,

    /// Identity credited with mining rewards
    hosting_node: Arc<RwLock<Address>>,

    /// Mining reward
    mining_reward: f64,

    /// Difficulty predicate and nonce search
    pow: ProofOfWork,

    /// Snapshot persistence, if configured
    store: Option<Arc<dyn SnapshotStore>>,

    /// Held for the whole of a mining attempt
    mining: Arc<Mutex<()>>,

    /// Set once the chain fails verification
    halted: Arc<AtomicBool>,
}

impl Ledger {
    /// Creates an in-memory ledger holding only the genesis block
    ///
    /// # Arguments
    ///
    /// * `hosting_node` - The address receiving mining rewards
    /// * `config` - Reward and difficulty settings
    pub fn new(hosting_node: Address, config: &LedgerConfig) -> Self {
        Ledger {
            chain: Arc::new(Mutex::new(vec![Block::genesis()])),
            open_transactions: Arc::new(Mutex::new(Vec::new())),
            hosting_node: Arc::new(RwLock::new(hosting_node)),
            mining_reward: config.mining_reward,
            pow: config.proof_of_work(),
            store: None,
            mining: Arc::new(Mutex::new(())),
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a ledger backed by a snapshot store
    ///
    /// A snapshot that cannot be loaded leaves the ledger at genesis with an
    /// empty pool. A snapshot whose chain fails verification is kept but the
    /// ledger is halted.
    pub fn with_store(hosting_node: Address, config: &LedgerConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let mut ledger = Ledger::new(hosting_node, config);

        match store.load_snapshot() {
            Ok((chain, open_transactions)) if !chain.is_empty() => {
                info!(
                    "Loaded {} blocks and {} open transactions from storage",
                    chain.len(),
                    open_transactions.len()
                );
                *lock(&ledger.chain) = chain;
                *lock(&ledger.open_transactions) = open_transactions;
            }
            Ok(_) => {
                warn!("Stored chain is empty, starting from the genesis block");
            }
            Err(StorageError::NotFound(what)) => {
                info!("{}, starting from the genesis block", what);
            }
            Err(err) => {
                warn!("Failed to load snapshot: {}", err);
                warn!("Starting from the genesis block instead");
            }
        }

        ledger.store = Some(store);
        ledger.verify_chain();
        ledger
    }

    /// Gets the address credited with mining rewards
    pub fn hosting_node(&self) -> Address {
        self.hosting_node.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Credits future mining rewards to `hosting_node`
    ///
    /// Chain and pool are untouched, and every clone of this ledger sees the
    /// new address.
    pub fn set_hosting_node(&self, hosting_node: Address) {
        *self.hosting_node.write().unwrap_or_else(PoisonError::into_inner) = hosting_node;
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.is_halted() {
            return Err(LedgerError::ChainInvalid);
        }
        Ok(())
    }

    /// Gets a copy of the entire chain
    pub fn get_chain(&self) -> Vec<Block> {
        lock(&self.chain).clone()
    }

    /// Gets a copy of the open transactions
    pub fn get_open_transactions(&self) -> Vec<Transaction> {
        lock(&self.open_transactions).clone()
    }

    /// Balance of `participant` including pending debits
    pub fn balance(&self, participant: &Address) -> f64 {
        let chain = lock(&self.chain);
        let open_transactions = lock(&self.open_transactions);
        balance::balance(participant, &chain, &open_transactions)
    }

    /// Balance of the hosting node
    pub fn hosting_balance(&self) -> f64 {
        self.balance(&self.hosting_node())
    }

    /// Adds a new transaction to the open pool
    ///
    /// # Arguments
    ///
    /// * `sender` - The sender's address (its public key)
    /// * `recipient` - The recipient's address
    /// * `amount` - The amount to transfer
    /// * `signature` - The sender's signature over the transfer
    ///
    /// # Returns
    ///
    /// The accepted transaction
    pub fn submit(
        &self,
        sender: Address,
        recipient: Address,
        amount: f64,
        signature: Option<DigitalSignature>,
    ) -> Result<Transaction, LedgerError> {
        self.ensure_active()?;

        let transaction = Transaction::new(sender, recipient, amount, signature);
        transaction.validate_amount()?;

        if transaction.is_reward() {
            return Err(LedgerError::RejectedTransaction(
                "reward transactions are issued by mining only".to_string(),
            ));
        }

        if !transaction.verify_signature() {
            warn!("Rejected transaction from {} with invalid signature", transaction.sender);
            return Err(LedgerError::SignatureVerificationFailure(transaction.sender));
        }

        let chain = lock(&self.chain);
        let mut open_transactions = lock(&self.open_transactions);

        let affordable = verification::verify_transaction(&transaction, |tx| {
            balance::balance(&tx.sender, &chain, &open_transactions)
        });
        if !affordable {
            return Err(LedgerError::RejectedTransaction(format!(
                "insufficient funds: required {}, available {}",
                transaction.amount,
                balance::balance(&transaction.sender, &chain, &open_transactions)
            )));
        }

        open_transactions.push(transaction.clone());
        info!(
            "Accepted transaction of {} from {} to {}",
            transaction.amount, transaction.sender, transaction.recipient
        );

        self.persist(&chain, &open_transactions);
        Ok(transaction)
    }

    /// Mines a new block from the open transactions
    ///
    /// The proof search runs without holding the chain or pool locks; the
    /// append afterwards is a single short critical section.
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine(&self) -> Result<Block, LedgerError> {
        self.ensure_active()?;
        let _mining = lock(&self.mining);

        let (index, previous_hash, transactions) = self.snapshot_tip()?;

        info!(
            "Mining block {} over {} transactions (target prefix {:?})",
            index,
            transactions.len(),
            self.pow.target_prefix()
        );
        let proof = self.pow.find_proof(&transactions, &previous_hash)?;

        if let Some(invalid) = transactions.iter().find(|tx| !tx.verify_signature()) {
            warn!("Mining aborted, open transaction from {} has an invalid signature", invalid.sender);
            return Err(LedgerError::SignatureVerificationFailure(invalid.sender.clone()));
        }

        let mined_count = transactions.len();
        let mut block_transactions = transactions;
        block_transactions.push(Transaction::reward(self.hosting_node(), self.mining_reward));
        let block = Block::new(index as u64, previous_hash, block_transactions, proof);

        self.append_block(block, mined_count)
    }

    /// Next block index, digest of the tip and a copy of the open pool
    fn snapshot_tip(&self) -> Result<(usize, String, Vec<Transaction>), LedgerError> {
        let chain = lock(&self.chain);
        let open_transactions = lock(&self.open_transactions);
        let last_block = chain.last().ok_or(LedgerError::ChainInvalid)?;
        Ok((chain.len(), hash_block(last_block), open_transactions.clone()))
    }

    /// Appends a mined block and removes the first `mined_count` open transactions
    ///
    /// Fails if the ledger was halted or the tip moved since the block's
    /// transactions were taken.
    fn append_block(&self, block: Block, mined_count: usize) -> Result<Block, LedgerError> {
        let mut chain = lock(&self.chain);
        let mut open_transactions = lock(&self.open_transactions);

        self.ensure_active()?;

        let tip_unchanged = chain.len() as u64 == block.index
            && chain.last().map(hash_block).as_deref() == Some(block.previous_hash.as_str());
        if !tip_unchanged || open_transactions.len() < mined_count {
            return Err(LedgerError::StaleChain);
        }

        chain.push(block.clone());
        open_transactions.drain(..mined_count);
        info!("Mined block {} with proof {}", block.index, block.proof);

        self.persist(&chain, &open_transactions);
        Ok(block)
    }

    /// Validates the chain, halting the ledger if it fails
    pub fn verify_chain(&self) -> bool {
        let chain = lock(&self.chain);
        let valid = verification::verify_chain(&chain, &self.pow);

        if !valid && !self.halted.swap(true, Ordering::SeqCst) {
            error!("Chain failed verification, refusing further transactions and mining");
        }

        valid
    }

    /// Checks every open transaction against its sender's current balance
    pub fn verify_open_transactions(&self) -> bool {
        let chain = lock(&self.chain);
        let open_transactions = lock(&self.open_transactions);

        verification::verify_transactions(&open_transactions, |tx| {
            balance::balance(&tx.sender, &chain, &open_transactions)
        })
    }

    fn persist(&self, chain: &[Block], open_transactions: &[Transaction]) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save_snapshot(chain, open_transactions) {
                warn!("Failed to save snapshot: {}", err);
            }
        }
    }
}
