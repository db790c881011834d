//! Shared application state for axum handlers.

use lightsync_app::worker::EngineHandle;

/// Application state shared across all axum handlers.
///
/// The engine handle is cheap to clone: it only holds channel senders and
/// `Arc`s to the shared registry.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

impl AppState {
    #[must_use]
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}
