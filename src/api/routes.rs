use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/wallet", web::post().to(handlers::create_wallet))
            .route("/wallet", web::get().to(handlers::load_wallet))
            .route("/balance", web::get().to(handlers::get_balance))
            .route("/balance/{address}", web::get().to(handlers::get_participant_balance))
            .route("/transaction", web::post().to(handlers::new_transaction))
            .route("/transactions/signed", web::post().to(handlers::submit_signed_transaction))
            .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
            .route("/mine", web::post().to(handlers::mine_block))
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/validate", web::get().to(handlers::validate_chain))
    );
}
