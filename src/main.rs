use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use storefront_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = Arc::new(api::db::establish_connection(&cfg).await?);
    if cfg.bootstrap_schema {
        api::db::bootstrap_schema(&db).await?;
    }

    let (event_sender, event_rx) = api::events::EventSender::channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    let payment_client = Arc::new(api::checkout::SandboxPaymentClient);
    let services = api::handlers::AppServices::new(
        db.clone(),
        event_sender.clone(),
        payment_client,
        &cfg,
    );

    let state = api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = Router::new()
        .nest("/api/v1", api::api_v1_routes())
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr()).await?;
    info!(addr = %cfg.bind_addr(), "storefront-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
        return;
    }
    info!("Shutdown signal received");
}
