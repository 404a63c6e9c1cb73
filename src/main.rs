use std::net::SocketAddr;
use std::sync::Arc;

use leadflow_api::config::Config;
use leadflow_api::db::Database;
use leadflow_api::db_storage::PgCrmStore;
use leadflow_api::handlers::AppState;
use leadflow_api::mailer::Notifier;
use leadflow_api::routes;
use leadflow_api::store::CrmStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and the mail
/// transport, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    if config.run_migrations {
        db.migrate().await?;
    }

    let store: Arc<dyn CrmStore> = Arc::new(PgCrmStore::new(db.pool.clone()));

    // A broken mail setup must not keep the CRM endpoints down
    let notifier = match &config.mail {
        Some(mail) => match Notifier::from_config(mail) {
            Ok(notifier) => {
                tracing::info!("✓ Mail transport initialized (sales: {})", mail.sales_address);
                Some(notifier)
            }
            Err(e) => {
                tracing::error!("Failed to initialize mail transport: {}", e);
                None
            }
        },
        None => None,
    };

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
        notifier,
    });

    let app = routes::app(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses feed the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
