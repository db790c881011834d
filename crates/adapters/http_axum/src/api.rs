//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod sse;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(devices::list).post(devices::register))
        .route("/devices/reload", post(devices::reload))
        .route("/devices/{id}", get(devices::get).delete(devices::delete))
        .route("/devices/{id}/toggle-light", post(devices::toggle_light))
        .route("/devices/{id}/toggle-mode", post(devices::toggle_mode))
        .route("/devices/{id}/light", put(devices::set_light))
        .route("/devices/{id}/mode", put(devices::set_mode))
        .route("/devices/{id}/name", put(devices::rename))
        .route("/notifications/stream", get(sse::stream))
}
