use std::sync::Arc;

use axum::{middleware, Router};

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;
pub mod service;

use rpc::dispatcher::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, max_body_bytes: usize) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            max_body_bytes,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(http::handlers::rpc_endpoint)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
