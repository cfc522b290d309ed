use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::state::AppState;

// GET /api/events — SSE stream of booking notifications
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(notification) => {
            let data = serde_json::to_string(&notification).unwrap_or_default();
            Some(Ok::<_, Infallible>(
                Event::default().data(data).event(notification.kind.as_str()),
            ))
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "event subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Sse::new(live_stream.merge(keepalive_stream))
}
