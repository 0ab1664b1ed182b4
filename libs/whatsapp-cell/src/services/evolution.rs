use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_database::digits_only;
use shared_models::notification::{Ack, NotificationDispatcher, NotificationError};

use crate::models::{SendTextRequest, SendTextResponse};
use crate::services::phone::with_country_code;

/// Evolution API client for outbound WhatsApp text messages.
/// POST {base_url}/message/sendText/{instance}, authenticated by `apikey`.
pub struct EvolutionApiClient {
    client: Client,
    base_url: String,
    instance: String,
    api_key: String,
    timeout_secs: u64,
}

impl EvolutionApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_whatsapp_configured() {
            return Err(NotificationError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.notification_timeout_secs))
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.evolution_api_url.trim_end_matches('/').to_string(),
            instance: config.evolution_api_instance.clone(),
            api_key: config.evolution_api_key.clone(),
            timeout_secs: config.notification_timeout_secs,
        })
    }
}

#[async_trait]
impl NotificationDispatcher for EvolutionApiClient {
    async fn send(&self, phone: &str, message: &str) -> Result<Ack, NotificationError> {
        if digits_only(phone).is_empty() {
            return Err(NotificationError::MissingPhone);
        }

        let url = format!("{}/message/sendText/{}", self.base_url, self.instance);
        let body = SendTextRequest {
            number: with_country_code(phone),
            text: message.to_string(),
        };

        debug!("Sending WhatsApp message through {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout(self.timeout_secs)
                } else {
                    NotificationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Evolution API rejected message: {} - {}", status, text);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        // Body shape varies between Evolution versions; the id is best effort.
        let message_id = serde_json::from_str::<SendTextResponse>(&text)
            .ok()
            .and_then(|r| r.key)
            .and_then(|k| k.id);

        info!("WhatsApp message accepted (id: {:?})", message_id);
        Ok(Ack { message_id })
    }
}
