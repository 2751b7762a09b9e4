use bistro_api::{build_router, state::AppState};
use bistro_config::Settings;
use bistro_db::{connect, indexes::ensure_indexes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "bistro_api=debug,bistro_services=debug,bistro_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!(
        "Starting Bistro API on {}:{}",
        settings.app.host, settings.app.port
    );
    info!(
        restaurant = %settings.restaurant.name,
        transactions = settings.database.transactions,
        currency = %settings.stripe.currency,
        "Runtime config"
    );

    // Connect to MongoDB
    let db = connect(&settings.database).await?;

    // Ensure indexes
    ensure_indexes(&db).await?;

    // Build app state (creates the restaurant document on first start)
    let app_state = AppState::new(db, settings.clone()).await?;

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
