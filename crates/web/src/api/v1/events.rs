use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use tokio_stream::{wrappers::WatchStream, StreamExt as _};
use tower_http::trace::TraceLayer;

use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/events", get(sse_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Streams the dashboard: the current one right away, then every update.
async fn sse_handler(
    State(WebState { tracker }): State<WebState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    log::debug!("Dashboard subscriber connected.");

    let stream = WatchStream::new(tracker.subscribe()).filter_map(|dashboard| {
        match Event::default().event("dashboard").json_data(&dashboard) {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(why) => {
                log::error!("Could not encode dashboard update: {}", why);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
