use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::notification::NotificationDispatcher;
use shared_models::{AppointmentDetails, AppointmentStatus};
use shared_utils::AppState;

use crate::models::{ConfirmationAction, WebhookError, WebhookOutcome, WebhookPayload};
use crate::services::dispatch::send_with_timeout;
use crate::services::messages::{cancelled_reply, confirmed_reply, MessageContext};
use crate::services::phone::{normalize_phone, same_phone};

const SYSTEM_MESSAGES: [&str; 4] = [
    "mensagem apagada",
    "message deleted",
    "esta mensagem foi apagada",
    "this message was deleted",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply(AppointmentStatus),
    AlreadyApplied,
    Rejected(AppointmentStatus),
}

/// Total transition function of the patient confirmation flow.
pub fn transition(current: AppointmentStatus, action: ConfirmationAction) -> Transition {
    use AppointmentStatus::*;
    use ConfirmationAction::*;

    match (current, action) {
        (Agendado, Confirm) => Transition::Apply(Confirmado),
        (Agendado, Cancel) => Transition::Apply(Cancelado),
        (Confirmado, Confirm) | (Cancelado, Cancel) => Transition::AlreadyApplied,
        (other, _) => Transition::Rejected(other),
    }
}

/// `"<action>_<appointmentId>"`, split on the first underscore. Unknown
/// actions and malformed ids yield `None`.
pub fn parse_button_id(button_id: &str) -> Option<(ConfirmationAction, Uuid)> {
    let (action, id) = button_id.split_once('_')?;
    let action = match action {
        "confirm" => ConfirmationAction::Confirm,
        "cancel" => ConfirmationAction::Cancel,
        _ => return None,
    };
    Some((action, Uuid::parse_str(id.trim()).ok()?))
}

/// CONFIRMAR wins when both keywords appear.
pub fn detect_keyword(text: &str) -> Option<ConfirmationAction> {
    let upper = text.to_uppercase();
    if upper.contains("CONFIRMAR") {
        Some(ConfirmationAction::Confirm)
    } else if upper.contains("CANCELAR") {
        Some(ConfirmationAction::Cancel)
    } else {
        None
    }
}

pub fn is_system_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    SYSTEM_MESSAGES.iter().any(|marker| lower.contains(marker))
}

pub struct ConfirmationService {
    store: SharedStore,
    notifier: Arc<dyn NotificationDispatcher>,
    timeout_secs: u64,
}

impl ConfirmationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            notifier: state.notifier.clone(),
            timeout_secs: state.config.notification_timeout_secs,
        }
    }

    /// Routes one webhook delivery to the button or free-text path.
    #[instrument(skip(self, payload))]
    pub async fn handle(&self, payload: WebhookPayload) -> Result<WebhookOutcome, WebhookError> {
        let Some(data) = payload.data else {
            return Ok(WebhookOutcome::Ignored("No data"));
        };

        // Echoes of our own outbound messages would otherwise loop forever.
        if data.from_me() {
            return Ok(WebhookOutcome::Ignored("Bot message ignored"));
        }

        let Some(sender) = data.sender().map(str::to_string) else {
            return Ok(WebhookOutcome::Ignored("No sender"));
        };

        if let Some(button_id) = data.button_id() {
            return match parse_button_id(button_id) {
                Some((action, appointment_id)) => self.handle_button(action, appointment_id, &sender).await,
                None => {
                    debug!("Unrecognized button id {}", button_id);
                    Ok(WebhookOutcome::Ignored("Unknown button action"))
                }
            };
        }

        let text = data.text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Ok(WebhookOutcome::Ignored("Empty text ignored"));
        }
        if is_system_message(text) {
            return Ok(WebhookOutcome::Ignored("System message ignored"));
        }

        match detect_keyword(text) {
            Some(action) => self.handle_text(action, &sender).await,
            None => Ok(WebhookOutcome::Ignored("Webhook processed without action")),
        }
    }

    async fn handle_button(
        &self,
        action: ConfirmationAction,
        appointment_id: Uuid,
        sender: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let details = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(|| WebhookError::NotFound(appointment_id.to_string()))?;

        verify_sender(&details, sender)?;
        self.apply(details, action, sender).await
    }

    async fn handle_text(&self, action: ConfirmationAction, sender: &str) -> Result<WebhookOutcome, WebhookError> {
        let normalized = normalize_phone(sender);
        let today = Utc::now().date_naive();

        let candidates = self
            .store
            .pending_appointments_for_phone(&normalized, today)
            .await?;

        let patients: HashSet<Uuid> = candidates.iter().map(|d| d.appointment.patient_id).collect();
        if patients.len() > 1 {
            warn!(
                "Phone {} matches {} patients with pending appointments; using the soonest",
                normalized,
                patients.len()
            );
        }

        let details = candidates
            .into_iter()
            .next()
            .ok_or_else(|| WebhookError::NotFound(format!("no pending appointment for {}", normalized)))?;

        // Candidate lookup is by substring; mutation requires an exact match.
        verify_sender(&details, sender)?;
        self.apply(details, action, sender).await
    }

    async fn apply(
        &self,
        details: AppointmentDetails,
        action: ConfirmationAction,
        sender: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let appointment_id = details.appointment.id;
        let current = details.appointment.status;

        let next = match transition(current, action) {
            Transition::Apply(next) => next,
            Transition::AlreadyApplied => {
                info!("Appointment {} already {}, nothing to do", appointment_id, current);
                return Ok(WebhookOutcome::Unchanged);
            }
            Transition::Rejected(status) => {
                info!("Appointment {} is {}, {:?} rejected", appointment_id, status, action);
                return Ok(WebhookOutcome::Unchanged);
            }
        };

        let Some(updated) = self.store.transition_status(appointment_id, current, next).await? else {
            // Another delivery of the same reply won the compare-and-set.
            info!("Appointment {} changed concurrently, skipping", appointment_id);
            return Ok(WebhookOutcome::Unchanged);
        };

        info!("Appointment {} moved {} -> {}", appointment_id, current, next);
        self.reply(&updated, action, sender).await;

        Ok(WebhookOutcome::Applied {
            appointment_id,
            status: updated.appointment.status,
        })
    }

    /// One reply per applied transition. Failures are logged only.
    async fn reply(&self, details: &AppointmentDetails, action: ConfirmationAction, sender: &str) {
        let ctx = MessageContext::from_details(details, None);
        let message = match action {
            ConfirmationAction::Confirm => confirmed_reply(&ctx),
            ConfirmationAction::Cancel => cancelled_reply(&ctx),
        };

        if let Err(e) = send_with_timeout(self.notifier.as_ref(), self.timeout_secs, sender, &message).await {
            warn!("Reply for appointment {} not delivered: {}", details.appointment.id, e);
        }
    }
}

fn verify_sender(details: &AppointmentDetails, sender: &str) -> Result<(), WebhookError> {
    let patient_phone = details
        .patient
        .as_ref()
        .and_then(|p| p.phone.as_deref())
        .unwrap_or_default();

    if same_phone(patient_phone, sender) {
        Ok(())
    } else {
        Err(WebhookError::Unauthorized)
    }
}
