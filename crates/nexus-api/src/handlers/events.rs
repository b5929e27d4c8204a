//! /events handler: Server-Sent Events stream of registry renderings.
//!
//! Every subscriber first gets the current table, then one `update-msg` event
//! per registry change. A subscriber that falls behind skips ahead to the
//! newest rendering.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast;

use super::ApiState;

const EVENT_NAME: &str = "update-msg";

pub async fn handle_events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before rendering so no change between the two is lost.
    let rx = state.feed.subscribe();
    let current = state.broker.registry().render_table();

    let updates = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(table) => return Some((table, rx)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "dashboard subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    let events = stream::once(async move { current })
        .chain(updates)
        .map(|table| Ok::<_, Infallible>(Event::default().event(EVENT_NAME).data(table)));

    Sse::new(events).keep_alive(KeepAlive::default())
}
