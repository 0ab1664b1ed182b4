use axum::{routing::get, Router};

use appointment_cell::appointment_routes;
use patient_cell::create_patient_router;
use professional_cell::professional_routes;
use shared_utils::AppState;
use whatsapp_cell::whatsapp_routes;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Scheduling API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/profissionals", professional_routes(state.clone()))
        // Public: authenticated by the sender's phone, not a JWT.
        .nest("/whatsapp", whatsapp_routes(state))
}
