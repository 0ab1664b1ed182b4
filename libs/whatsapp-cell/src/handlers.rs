use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{WebhookError, WebhookOutcome, WebhookPayload, WebhookResponse};
use crate::services::ConfirmationService;

const NO_ACTION: &str = "Webhook processed without action";

fn respond(message: &str) -> Json<WebhookResponse> {
    Json(WebhookResponse {
        success: true,
        message: message.to_string(),
        status: None,
    })
}

/// Evolution API callback. Public; the caller is authenticated by phone.
///
/// Unknown appointments and phone mismatches answer exactly like a no-op so
/// the endpoint cannot be used to probe appointment ids.
#[axum::debug_handler]
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!("Empty webhook body ignored");
        return Ok(respond("Empty body ignored"));
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!("Webhook body is not valid JSON: {}", e);
        AppError::BadRequest("Invalid JSON".to_string())
    })?;

    debug!("Webhook event {:?} from instance {:?}", payload.event, payload.instance);

    let service = ConfirmationService::new(&state);

    match service.handle(payload).await {
        Ok(WebhookOutcome::Ignored(reason)) => {
            debug!("Webhook ignored: {}", reason);
            Ok(respond(reason))
        }
        Ok(WebhookOutcome::Applied { appointment_id, status }) => {
            info!("Webhook set appointment {} to {}", appointment_id, status);
            Ok(Json(WebhookResponse {
                success: true,
                message: format!("Appointment {} updated", appointment_id),
                status: Some(status),
            }))
        }
        Ok(WebhookOutcome::Unchanged) => Ok(respond(NO_ACTION)),
        Err(WebhookError::NotFound(what)) => {
            warn!("Webhook without matching appointment: {}", what);
            Ok(respond(NO_ACTION))
        }
        Err(WebhookError::Unauthorized) => {
            warn!("Webhook sender phone does not match the appointment's patient");
            Ok(respond(NO_ACTION))
        }
        Err(WebhookError::Store(e)) => Err(AppError::Database(e.to_string())),
    }
}

pub async fn webhook_status() -> Json<Value> {
    Json(json!({
        "status": "Webhook active",
        "description": "Processes appointment confirmations via WhatsApp"
    }))
}
