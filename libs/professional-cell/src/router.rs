use axum::{middleware, routing::get, Router};

use shared_utils::{auth_middleware, AppState};

use crate::handlers;

pub fn professional_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::search_professionals).post(handlers::create_professional),
        )
        .route(
            "/{profissional_id}",
            get(handlers::get_professional)
                .put(handlers::update_professional)
                .delete(handlers::delete_professional),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
