use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Block, DigitalSignature, LedgerError, Transaction};

use super::state::AppState;

/// Data structure for the application state
pub type AppData = web::Data<AppState>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
///
/// The node's own wallet is the sender and signs the transfer.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,
}

/// Request for submitting a transaction signed elsewhere
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SignedTransactionRequest {
    /// The sender's address (public key)
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,

    /// The sender's signature over sender, recipient and amount
    pub signature: String,
}

/// Response for the transaction endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub message: String,

    /// The accepted transaction
    pub transaction: Transaction,

    /// The hosting node's balance after the transaction
    pub funds: f64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    pub message: String,

    /// The newly mined block
    pub block: Block,

    /// The hosting node's balance after mining
    pub funds: f64,
}

/// Response for the wallet endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's public key (base58), also its address
    pub public_key: String,

    /// The wallet's private key (hex encoded)
    pub private_key: String,

    /// The wallet's balance
    pub funds: f64,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Whether hash links and proofs hold across the chain
    pub chain_valid: bool,

    /// Whether every open transaction is covered by its sender's balance
    pub open_transactions_valid: bool,
}

/// Response for the balance endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,
    pub funds: f64,
}

fn error_response(err: &LedgerError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });

    match err {
        LedgerError::RejectedTransaction(_) | LedgerError::SignatureVerificationFailure(_) => {
            HttpResponse::BadRequest().json(body)
        }
        LedgerError::ChainInvalid | LedgerError::StaleChain => HttpResponse::Conflict().json(body),
        LedgerError::Proof(_) | LedgerError::Storage(_) => {
            error!("Ledger operation failed: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Create a new wallet
///
/// Generates a keypair, saves it to the key file and makes it the node's
/// mining identity
#[utoipa::path(
    post,
    path = "/api/v1/wallet",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse),
        (status = 500, description = "Saving the keys failed")
    )
)]
pub async fn create_wallet(state: AppData) -> impl Responder {
    match state.create_wallet() {
        Ok(node) => HttpResponse::Created().json(WalletResponse {
            public_key: node.wallet.address().0.clone(),
            private_key: hex::encode(node.wallet.export_secret_key()),
            funds: node.ledger.hosting_balance(),
        }),
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Saving the keys failed: {}", err)
        })),
    }
}

/// Load the saved wallet
///
/// Reads the key file and makes it the node's mining identity
#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    responses(
        (status = 200, description = "Wallet loaded successfully", body = WalletResponse),
        (status = 500, description = "Loading the keys failed")
    )
)]
pub async fn load_wallet(state: AppData) -> impl Responder {
    match state.load_wallet() {
        Ok(node) => HttpResponse::Ok().json(WalletResponse {
            public_key: node.wallet.address().0.clone(),
            private_key: hex::encode(node.wallet.export_secret_key()),
            funds: node.ledger.hosting_balance(),
        }),
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Loading the keys failed: {}", err)
        })),
    }
}

/// Get the hosting node's balance
#[utoipa::path(
    get,
    path = "/api/v1/balance",
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse)
    )
)]
pub async fn get_balance(state: AppData) -> impl Responder {
    let node = state.node();

    HttpResponse::Ok().json(BalanceResponse {
        address: node.ledger.hosting_node().0,
        funds: node.ledger.hosting_balance(),
    })
}

/// Get any participant's balance
#[utoipa::path(
    get,
    path = "/api/v1/balance/{address}",
    params(
        ("address" = String, Path, description = "Participant address")
    ),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse)
    )
)]
pub async fn get_participant_balance(state: AppData, address: web::Path<String>) -> impl Responder {
    let address = Address(address.into_inner());
    let funds = state.node().ledger.balance(&address);

    HttpResponse::Ok().json(BalanceResponse {
        address: address.0,
        funds,
    })
}

/// Create a new transaction from the node's wallet
///
/// Signs the transfer with the node's keys and adds it to the open pool
#[utoipa::path(
    post,
    path = "/api/v1/transaction",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction added successfully", body = TransactionResponse),
        (status = 400, description = "Transaction rejected"),
        (status = 409, description = "Ledger halted")
    )
)]
pub async fn new_transaction(
    state: AppData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let node = state.node();
    let request = transaction_req.into_inner();
    let signed = Transaction::signed(&node.wallet, Address(request.recipient), request.amount);

    match node.ledger.submit(
        signed.sender,
        signed.recipient,
        signed.amount,
        signed.signature,
    ) {
        Ok(transaction) => HttpResponse::Created().json(TransactionResponse {
            message: "Successfully added transaction".to_string(),
            transaction,
            funds: node.ledger.hosting_balance(),
        }),
        Err(err) => error_response(&err),
    }
}

/// Submit a transaction signed by another wallet
#[utoipa::path(
    post,
    path = "/api/v1/transactions/signed",
    request_body = SignedTransactionRequest,
    responses(
        (status = 201, description = "Transaction added successfully", body = TransactionResponse),
        (status = 400, description = "Transaction rejected"),
        (status = 409, description = "Ledger halted")
    )
)]
pub async fn submit_signed_transaction(
    state: AppData,
    transaction_req: web::Json<SignedTransactionRequest>,
) -> impl Responder {
    let ledger = state.node().ledger;
    let request = transaction_req.into_inner();

    match ledger.submit(
        Address(request.sender),
        Address(request.recipient),
        request.amount,
        Some(DigitalSignature(request.signature)),
    ) {
        Ok(transaction) => HttpResponse::Created().json(TransactionResponse {
            message: "Successfully added transaction".to_string(),
            transaction,
            funds: ledger.hosting_balance(),
        }),
        Err(err) => error_response(&err),
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(state: AppData) -> impl Responder {
    HttpResponse::Ok().json(state.node().ledger.get_open_transactions())
}

/// Mine a new block
///
/// Creates a new block from all open transactions and rewards the node
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 201, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Open transaction with invalid signature"),
        (status = 409, description = "Ledger halted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(state: AppData) -> impl Responder {
    let ledger = state.node().ledger;
    let miner = ledger.clone();

    // Proof search is CPU bound; keep it off the async workers
    match web::block(move || miner.mine()).await {
        Ok(Ok(block)) => HttpResponse::Created().json(MineResponse {
            message: "Block added successfully".to_string(),
            block,
            funds: ledger.hosting_balance(),
        }),
        Ok(Err(err)) => error_response(&err),
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Mining task failed: {}", err)
        })),
    }
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(state: AppData) -> impl Responder {
    let ledger = state.node().ledger;
    let chain = ledger.get_chain();
    let is_valid = ledger.verify_chain();

    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
    })
}

/// Check if the blockchain is valid
///
/// Validates the entire blockchain and the open transactions
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(state: AppData) -> impl Responder {
    let ledger = state.node().ledger;

    HttpResponse::Ok().json(ValidationResponse {
        chain_valid: ledger.verify_chain(),
        open_transactions_valid: ledger.verify_open_transactions(),
    })
}
