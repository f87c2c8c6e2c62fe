use axum::{
    extract::{OriginalUri, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use model::status::{BackendStatus, TrackerStatus};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    common::{schema_no_example, JsonResult, Outcome, RouteErrorResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/status/schema", get(schema_no_example::<StatusDto>))
        .route("/refresh", post(refresh))
        .route("/backend/retry", post(retry_backend))
        .with_state(state)
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct StatusDto {
    #[serde(flatten)]
    status: TrackerStatus,
    /// Degraded-state message for the dashboard banner.
    banner: Option<String>,
}

async fn get_status(State(WebState { tracker }): State<WebState>) -> Json<StatusDto> {
    let status = tracker.dashboard().status;
    Json(StatusDto {
        banner: status.banner(),
        status,
    })
}

async fn refresh(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<Outcome> {
    tracker.refresh().await.map(Outcome::json).map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    })
}

async fn retry_backend(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<BackendStatus> {
    tracker
        .retry_interactive()
        .await
        .map(|()| Json(tracker.dashboard().status.backend))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}
