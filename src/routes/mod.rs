pub mod comments;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface with tracing applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(comments::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
