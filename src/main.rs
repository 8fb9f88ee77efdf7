use std::sync::Arc;

use migration::MigratorTrait;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webcert_backend::{
    build_router,
    config::AppConfig,
    services::{
        mailer::SmtpMailer,
        order_repository::SeaOrmOrderRepository,
        order_service::OrderService,
        receipt_store::ReceiptStore,
        telegram::TelegramAnnouncer,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webcert_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().inspect_err(|e| tracing::error!("Invalid configuration: {}", e))?;

    // Storage problems leave the service up in degraded mode
    tracing::info!("Connecting to database...");
    let repository = match Database::connect(&config.database_url).await {
        Ok(db) => {
            tracing::info!("Running migrations...");
            if let Err(e) = migration::Migrator::up(&db, None).await {
                tracing::error!("Failed to run migrations: {}", e);
            }
            SeaOrmOrderRepository::new(db)
        }
        Err(e) => {
            tracing::error!("Database connection error, order storage unavailable: {}", e);
            SeaOrmOrderRepository::degraded()
        }
    };

    let receipts = ReceiptStore::new(config.upload_dir.clone());
    if let Err(e) = receipts.ensure_dir().await {
        tracing::error!("{}", e);
    }

    let mailer = SmtpMailer::new(&config.smtp)?;
    let announcer = TelegramAnnouncer::new(&config.telegram);

    let state = AppState {
        orders: OrderService::new(Arc::new(repository), receipts, Arc::new(announcer), Arc::new(mailer)),
        public_base_url: config.public_base_url.clone(),
        admin_api_key: config.admin_api_key.clone(),
    };
    if state.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY is not set, admin API routes are open");
    }

    let app = build_router(state, &config.frontend_dir, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
