use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers::{receive_webhook, webhook_status};

/// Public routes: the messaging provider cannot present a user JWT.
pub fn whatsapp_routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(webhook_status).post(receive_webhook))
        .with_state(state)
}
