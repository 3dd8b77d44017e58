use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::storage::{self, StorageError};
use blockchain::{FileSnapshotStore, SledSnapshotStore, SnapshotStore, Wallet};
use config::{Config, StorageBackend};

// Load the node's keys, creating and saving a new pair on first start
fn load_or_create_wallet(config: &Config) -> anyhow::Result<Wallet> {
    let key_path = config.key_path();

    match storage::load_keys(&key_path) {
        Ok(wallet) => {
            info!("Loaded wallet {} from {}", wallet.address(), key_path.display());
            Ok(wallet)
        }
        Err(StorageError::NotFound(_)) => {
            let wallet = Wallet::new();
            storage::save_keys(&key_path, &wallet)
                .with_context(|| format!("saving new keys to {}", key_path.display()))?;
            info!("Created wallet {} at {}", wallet.address(), key_path.display());
            Ok(wallet)
        }
        Err(err) => Err(err).with_context(|| format!("loading keys from {}", key_path.display())),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    std::fs::create_dir_all(&config.data_dir).unwrap_or_else(|e| {
        warn!("Failed to create data directory: {}", e);
    });

    let path = config.snapshot_path();
    let store: Arc<dyn SnapshotStore> = match config.storage {
        StorageBackend::File => Arc::new(FileSnapshotStore::new(&path)),
        StorageBackend::Sled => Arc::new(
            SledSnapshotStore::new(&path)
                .with_context(|| format!("opening sled database at {}", path.display()))?,
        ),
    };

    info!("Using {:?} snapshot storage at {}", config.storage, path.display());
    Ok(store)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::create_wallet,
        api::handlers::load_wallet,
        api::handlers::get_balance,
        api::handlers::get_participant_balance,
        api::handlers::new_transaction,
        api::handlers::submit_signed_transaction,
        api::handlers::get_pending_transactions,
        api::handlers::mine_block,
        api::handlers::get_chain,
        api::handlers::validate_chain
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::crypto::Address,
            blockchain::crypto::DigitalSignature,
            api::handlers::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::SignedTransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::WalletResponse,
            api::handlers::ValidationResponse,
            api::handlers::BalanceResponse
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "A single-node proof-of-work transfer ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;
    let wallet = load_or_create_wallet(&config)?;
    let store = open_store(&config)?;

    let state = web::Data::new(api::AppState::new(
        wallet,
        config.ledger.clone(),
        store,
        config.key_path(),
    ));

    if !state.node().ledger.verify_chain() {
        warn!("Loaded chain is invalid; serving read-only until it is repaired");
    }

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
