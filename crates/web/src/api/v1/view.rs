use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use model::{vehicle::VehicleId, view::RenderedView};

use crate::{
    common::{schema_no_example, JsonResult, Outcome, RouteErrorResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/view", get(get_view))
        .route("/view/schema", get(schema_no_example::<RenderedView>))
        .route("/view/fit", post(fit_all))
        .route("/view/close-details", post(close_details))
        .route("/markers/:id/select", post(select_marker))
        .with_state(state)
}

async fn get_view(State(WebState { tracker }): State<WebState>) -> Json<RenderedView> {
    Json(tracker.dashboard().view)
}

async fn fit_all(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<RenderedView> {
    tracker
        .fit_all()
        .await
        .map(|()| Json(tracker.dashboard().view))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn close_details(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<RenderedView> {
    tracker
        .close_details()
        .await
        .map(|()| Json(tracker.dashboard().view))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

/// Same as a click on the marker: the engine starts following the vehicle.
async fn select_marker(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<Outcome> {
    let selected = tracker
        .select_marker(VehicleId::new(id.clone()))
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })?;
    if !selected {
        return Err(RouteErrorResponse::new(StatusCode::NOT_FOUND)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
            .with_message(format!("No marker is shown for vehicle {}.", id)));
    }
    Ok(Outcome::json(true))
}
