use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::handlers;
use crate::service::ScheduleService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScheduleService>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/schedule/api/list", get(handlers::list))
        .route("/schedule/api/query", get(handlers::query))
        .route("/schedule/api/cancel", put(handlers::cancel))
        .route("/schedule/api/pause", put(handlers::pause))
        .route("/schedule/api/resume", put(handlers::resume))
        .route("/schedule/api/schedule", put(handlers::schedule))
        .route("/schedule/api/delete", delete(handlers::delete))
        .route("/schedule/api/query_handler", get(handlers::query_handler))
        .route("/schedule/api/query_error", get(handlers::query_error))
        .with_state(state)
}
