use axum::routing::{get, post};
use axum::Router;
use safehouse_backend::api;
use safehouse_backend::config::Config;
use safehouse_backend::database::processed_transaction_repository::ProcessedTransactionRepository;
use safehouse_backend::database::{self, PoolConfig};
use safehouse_backend::notifications::MailRelayNotifier;
use safehouse_backend::payments::providers::FlutterwaveProvider;
use safehouse_backend::payments::reconcile::{ReconcileConfig, ReconciliationEngine};
use safehouse_backend::payments::traits::PaymentProvider;
use safehouse_backend::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting Safehouse Backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "Webhook signature mode: {}",
        config.flutterwave.signature_mode.as_str()
    );

    let pool = database::init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await?;

    let ledger = Arc::new(ProcessedTransactionRepository::new(pool.clone()));
    let notifier = Arc::new(MailRelayNotifier::new(config.mailer.clone()));
    let provider: Arc<dyn PaymentProvider> =
        Arc::new(FlutterwaveProvider::new(config.flutterwave.clone()));

    let engine = Arc::new(ReconciliationEngine::new(
        provider.clone(),
        notifier,
        ledger,
        ReconcileConfig {
            webhook_secret: config.flutterwave.webhook_secret.clone(),
            signature_mode: config.flutterwave.signature_mode,
            sales_address: config.mailer.sales_address.clone(),
        },
    ));

    let state = AppState {
        config: config.clone(),
        provider,
        engine,
    };

    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/payments", post(api::payments::payments_root))
        .route("/payments/initiate", post(api::payments::initiate_payment))
        .route("/payments/webhook", post(api::payments::payment_webhook))
        .route("/payments/verify", post(api::payments::verify_payment))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
