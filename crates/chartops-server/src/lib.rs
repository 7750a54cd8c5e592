pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/apps", get(routes::apps::list_apps))
        .route("/api/apps/{id}", get(routes::apps::get_app))
        .route("/api/apps/{id}/upgrade", post(routes::apps::upgrade_app))
        .route("/api/apps/{id}/rollback", post(routes::apps::rollback_app))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `0.0.0.0:<port>`.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(state, listener).await
}

/// Serve the API on a pre-bound listener.
///
/// Unlike `serve`, the caller can read the actual port before starting
/// (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    tracing::info!(
        root = %state.root.display(),
        "chartops API listening on http://localhost:{port}"
    );
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
