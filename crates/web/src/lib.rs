pub use crate::common::RouteResult;

use axum::{extract::FromRef, routing::on, Router};
use common::{route_not_found, METHOD_FILTER_ALL};
use tokio::net::TcpListener;
use tracking::handle::TrackerHandle;

pub mod api;
pub mod common;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub tracker: TrackerHandle,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Serves the dashboard API until the listener fails.
pub async fn start_web_server(state: WebState, listen_address: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_address).await?;
    log::info!("Dashboard API listening on {}.", listen_address);
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}
