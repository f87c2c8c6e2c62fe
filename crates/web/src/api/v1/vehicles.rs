use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::{get, put},
    Json, Router,
};
use model::{
    follow::FollowState,
    vehicle::{VehicleId, VehiclePosition},
    WithId,
};

use crate::{
    common::{schema, JsonResult, Outcome, RouteErrorResponse, VecResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/vehicles", get(get_vehicles))
        .route("/vehicles/schema", get(schema::<VehiclePosition>))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/follow", get(get_follow).delete(stop_following))
        .route("/follow/:id", put(follow))
        .with_state(state)
}

/// Every vehicle of the latest snapshot, those without coordinates included.
async fn get_vehicles(
    State(WebState { tracker }): State<WebState>,
) -> Json<VecResponse<WithId<VehiclePosition>>> {
    VecResponse::new(tracker.dashboard().vehicles).json()
}

async fn get_vehicle(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<WithId<VehiclePosition>> {
    let id = VehicleId::new(id);
    tracker
        .dashboard()
        .vehicles
        .into_iter()
        .find(|vehicle| vehicle.id == id)
        .map(Json)
        .ok_or_else(|| {
            RouteErrorResponse::new(StatusCode::NOT_FOUND)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
                .with_message(format!("Vehicle {} is not part of the fleet.", id))
        })
}

async fn get_follow(State(WebState { tracker }): State<WebState>) -> Json<FollowState> {
    Json(tracker.dashboard().status.follow)
}

async fn follow(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<FollowState> {
    tracker
        .follow(VehicleId::new(id))
        .await
        .map(|()| Json(tracker.dashboard().status.follow))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::PUT)
                .with_uri(original_uri.path())
        })
}

async fn stop_following(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracker }): State<WebState>,
) -> JsonResult<Outcome> {
    tracker
        .stop_following()
        .await
        .map(Outcome::json)
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}
