use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

mod common;
mod webhook;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/robots.txt", get(common::get_robots))
        .route("/api/webhook/check", post(webhook::webhook))
}
