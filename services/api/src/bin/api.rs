//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, FileLedger, OpenRouterAdapter, WebhookRelay, WppConnectBridge},
    assistant::Assistant,
    autoreply::{Autoresponder, PendingReplyQueue},
    config::Config,
    error::ApiError,
    outreach::CampaignSender,
    session::{run_event_loop, PairingPolicy, SessionConfig, SessionManager, SessionObserver},
    web::{build_router, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use outreach_core::domain::LaunchOptions;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    if config.openrouter_api_key.is_none() {
        info!("OPENROUTER_API_KEY not set; AI features will report unavailable");
    }
    let llm = Arc::new(OpenRouterAdapter::new(
        config.openrouter_api_key.as_deref(),
        &config.llm_base_url,
        config.llm_model.clone(),
    ));

    let webhooks = Arc::new(WebhookRelay::new());
    let platform = Arc::new(WppConnectBridge::new(
        &config.wppconnect_url,
        config.wppconnect_secret.clone(),
        config.sidecar_webhook_url(),
        webhooks.clone(),
    )?);

    // --- 4. Build the Session Manager and the Services Around It ---
    let (session, session_events) = SessionManager::new(
        platform,
        SessionConfig {
            launch: LaunchOptions::new(config.session_name.clone()),
            credentials_dir: config.session_dir(),
            reconnect_interval: config.reconnect_interval,
            pairing: PairingPolicy {
                timeout: config.pairing_timeout,
                max_attempts: config.pairing_max_attempts,
                retry_delay: config.pairing_retry_delay,
            },
        },
    );

    let assistant = Arc::new(Assistant::new(llm));
    let queue = Arc::new(PendingReplyQueue::new(db_adapter.clone(), session.clone()));
    let autoresponder = Arc::new(Autoresponder::new(
        db_adapter.clone(),
        session.clone(),
        assistant.clone(),
        queue,
        Some(config.company_info.clone()),
    ));
    let outreach = Arc::new(CampaignSender::new(
        db_adapter.clone(),
        session.clone(),
        Arc::new(FileLedger::new(config.sent_ledger_path.clone())),
        config.send_delay,
        config.media_attachment_path.clone(),
    ));

    let shutdown = CancellationToken::new();
    let observer: Arc<dyn SessionObserver> = autoresponder.clone();
    let event_loop = tokio::spawn(run_event_loop(
        session.clone(),
        session_events,
        observer,
        shutdown.clone(),
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        session: session.clone(),
        assistant,
        autoresponder,
        outreach,
        webhooks,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let app = Router::new()
        .merge(build_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // --- 8. Tear Down the Messaging Session ---
    shutdown.cancel();
    session.disconnect().await;
    let _ = event_loop.await;
    info!("Server stopped");

    Ok(())
}
