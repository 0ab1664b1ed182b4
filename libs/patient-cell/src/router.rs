use axum::{middleware, routing::get, Router};

use shared_utils::{auth_middleware, AppState};

use crate::handlers::*;

pub fn create_patient_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(search_patients).post(create_patient))
        .route("/{id}", get(get_patient).put(update_patient))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
