use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::AppointmentStatus;

// ==============================================================================
// EVOLUTION API WEBHOOK ENVELOPE
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: Option<String>,
    pub instance: Option<String>,
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    pub key: Option<MessageKey>,
    pub selected_button_id: Option<String>,
    pub message: Option<MessageContent>,
    pub push_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub buttons_response_message: Option<ButtonsResponse>,
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedText>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsResponse {
    pub selected_button_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedText {
    pub text: Option<String>,
}

impl WebhookData {
    /// Button id from either the flat or the nested envelope shape.
    pub fn button_id(&self) -> Option<&str> {
        self.selected_button_id
            .as_deref()
            .or_else(|| {
                self.message
                    .as_ref()
                    .and_then(|m| m.buttons_response_message.as_ref())
                    .and_then(|b| b.selected_button_id.as_deref())
            })
            .filter(|id| !id.trim().is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        let message = self.message.as_ref()?;
        message
            .conversation
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| message.extended_text_message.as_ref().and_then(|e| e.text.as_deref()))
    }

    pub fn from_me(&self) -> bool {
        self.key.as_ref().is_some_and(|k| k.from_me)
    }

    /// Sender phone as sent by WhatsApp, without the `@s.whatsapp.net` suffix.
    pub fn sender(&self) -> Option<&str> {
        self.key
            .as_ref()
            .and_then(|k| k.remote_jid.as_deref())
            .map(|jid| jid.trim_end_matches("@s.whatsapp.net"))
    }
}

// ==============================================================================
// OUTBOUND sendText
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTextRequest {
    pub number: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendTextResponse {
    pub key: Option<MessageKey>,
    pub status: Option<String>,
}

// ==============================================================================
// PROCESSING RESULTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationAction {
    Confirm,
    Cancel,
}

/// What a webhook delivery led to. Every variant answers 200.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Ignored(&'static str),
    Applied {
        appointment_id: Uuid,
        status: AppointmentStatus,
    },
    Unchanged,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Sender phone does not match the patient")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
