pub mod error;
pub mod locks;
pub mod payload;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all webhook and API routes.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Webhooks
        .route("/webhook", post(routes::webhooks::tautulli))
        .route("/jellyfin-webhook", post(routes::webhooks::jellyfin))
        .route("/sonarr-webhook", post(routes::webhooks::sonarr))
        // Rules
        .route("/api/rules", get(routes::rules::list_rules))
        .route(
            "/api/rules/{name}",
            put(routes::rules::put_rule).delete(routes::rules::delete_rule),
        )
        .route(
            "/api/rules/{name}/assign",
            post(routes::rules::assign_series),
        )
        .route(
            "/api/rules/{name}/unassign",
            post(routes::rules::unassign_series),
        )
        // Operator views
        .route("/api/missing", get(routes::missing::list_missing))
        .route("/api/health", get(routes::missing::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the webhook server on `0.0.0.0:{port}`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the webhook server on a pre-bound listener.
///
/// Lets the caller read the actual port first when binding to port 0.
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let root = app_state.root.display().to_string();
    let app = build_router(app_state);

    tracing::info!(%root, "nextup listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
