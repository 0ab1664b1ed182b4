use std::sync::Arc;

use axum::extract::FromRef;

use shared_config::AppConfig;
use shared_database::SharedStore;
use shared_models::notification::NotificationDispatcher;

/// Handles shared by every request. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: SharedStore,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { config, store, notifier }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
