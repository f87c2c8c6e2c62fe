use axum::{routing::on, Router};

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod events;
mod status;
mod vehicles;
mod view;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .merge(status::routes(state.clone()))
        .merge(vehicles::routes(state.clone()))
        .merge(view::routes(state.clone()))
        .merge(events::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
