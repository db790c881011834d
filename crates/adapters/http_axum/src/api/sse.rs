//! Server-Sent Events (SSE) stream of device list notifications.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use lightsync_app::notifier::Notification;

use crate::state::AppState;

/// `GET /api/notifications/stream`
///
/// The first frame is a `reset` carrying the current list, so a client can
/// render immediately and then apply the `changed` diffs that follow. The
/// subscription is taken before the snapshot, so no change falls between
/// the two.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.subscribe();
    let initial = Notification::Reset {
        devices: state.engine.snapshot(),
    };

    let notifications = tokio_stream::once(Ok(initial))
        .chain(BroadcastStream::new(rx))
        .filter_map(|result| match result {
            Ok(notification) => to_event(&notification).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(
                    skipped = n,
                    "SSE subscriber lagged, some notifications were dropped"
                );
                None
            }
        });

    Sse::new(notifications).keep_alive(KeepAlive::default())
}

fn to_event(notification: &Notification) -> Option<Event> {
    match serde_json::to_string(notification) {
        Ok(json) => Some(Event::default().data(json)),
        Err(err) => {
            tracing::warn!(%err, "failed to serialize notification for SSE stream");
            None
        }
    }
}
