pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod signature;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use github_app::GitHubApp;
use tower_http::trace::TraceLayer;
use zbot_core::{CredentialProvider, Dispatcher, RulesLocation};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the axum Router with the webhook and health routes.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(routes::webhook::receive))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Wire the GitHub client, dispatcher and webhook secret into app state.
pub fn build_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let app = GitHubApp::new(config.app_id, config.key, &config.api_url)?;
    let dispatcher = Dispatcher::new(
        CredentialProvider::new(Arc::new(app)),
        RulesLocation::at_ref(config.rules_ref),
    );
    Ok(AppState::new(Arc::new(dispatcher), config.secret))
}

/// Start the webhook server and the scheduler.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let port = config.port;
    let app_state = build_state(config)?;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener, app_state).await
}

/// Start on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    app_state: AppState,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let scheduler = scheduler::spawn(Arc::clone(&app_state.dispatcher));

    tracing::info!("zbot listening on http://localhost:{actual_port}");

    let served = axum::serve(listener, build_router(app_state)).await;
    scheduler.abort();
    served?;
    Ok(())
}
