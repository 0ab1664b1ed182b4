use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::{auth_middleware, AppState};

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::book_appointment))
        .route("/available-times", get(handlers::get_available_times))
        .route("/send-confirmations", post(handlers::send_confirmations))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/send-reminder", post(handlers::send_reminder))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
