use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_models::notification::{Ack, NotificationDispatcher, NotificationError};

use crate::services::evolution::EvolutionApiClient;

/// Stand-in used when Evolution API credentials are absent. Every send fails
/// with `NotConfigured`, which callers log and move past.
pub struct DisabledDispatcher;

#[async_trait]
impl NotificationDispatcher for DisabledDispatcher {
    async fn send(&self, _phone: &str, _message: &str) -> Result<Ack, NotificationError> {
        warn!("WhatsApp notification skipped: Evolution API not configured");
        Err(NotificationError::NotConfigured)
    }
}

pub fn dispatcher_from_config(config: &AppConfig) -> Arc<dyn NotificationDispatcher> {
    match EvolutionApiClient::new(config) {
        Ok(client) => {
            info!("WhatsApp notifications enabled for instance {}", config.evolution_api_instance);
            Arc::new(client)
        }
        Err(e) => {
            warn!("WhatsApp notifications disabled: {}", e);
            Arc::new(DisabledDispatcher)
        }
    }
}

/// Bounds a single send. The timeout surfaces as `NotificationError::Timeout`.
pub async fn send_with_timeout(
    notifier: &dyn NotificationDispatcher,
    timeout_secs: u64,
    phone: &str,
    message: &str,
) -> Result<Ack, NotificationError> {
    match tokio::time::timeout(Duration::from_secs(timeout_secs), notifier.send(phone, message)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout(timeout_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl NotificationDispatcher for Slow {
        async fn send(&self, _phone: &str, _message: &str) -> Result<Ack, NotificationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Ack::default())
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let result = send_with_timeout(&Slow, 1, "11999990000", "oi").await;
        assert_eq!(result, Err(NotificationError::Timeout(1)));
    }

    #[tokio::test]
    async fn missing_credentials_disable_sending() {
        let dispatcher = dispatcher_from_config(&AppConfig::default());
        assert_eq!(
            dispatcher.send("11999990000", "oi").await,
            Err(NotificationError::NotConfigured)
        );
    }
}
