use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::notification::NotificationDispatcher;
use shared_models::{AppointmentDetails, AppointmentFilter, AppointmentStatus};
use shared_utils::AppState;
use whatsapp_cell::services::messages::{confirmation_request, reminder};
use whatsapp_cell::services::MessageContext;
use whatsapp_cell::send_with_timeout;

use crate::models::{AppointmentError, ConfirmationDelivery, ConfirmationSummary, DeliveryStatus};

/// Outbound WhatsApp messages triggered by clinic staff or a daily job.
pub struct ReminderService {
    store: SharedStore,
    notifier: Arc<dyn NotificationDispatcher>,
    timeout_secs: u64,
}

impl ReminderService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            notifier: state.notifier.clone(),
            timeout_secs: state.config.notification_timeout_secs,
        }
    }

    async fn clinic_name(&self, clinic_id: Uuid) -> Option<String> {
        match self.store.get_clinic(clinic_id).await {
            Ok(clinic) => clinic.map(|c| c.name),
            Err(e) => {
                warn!("Could not load clinic {}: {}", clinic_id, e);
                None
            }
        }
    }

    fn patient_phone(details: &AppointmentDetails) -> Option<String> {
        details
            .patient
            .as_ref()
            .and_then(|p| p.phone.clone())
            .filter(|phone| !phone.trim().is_empty())
    }

    #[instrument(skip(self))]
    pub async fn send_reminder(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let details = self
            .store
            .get_appointment(clinic_id, appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let phone = Self::patient_phone(&details).ok_or(AppointmentError::MissingPhone)?;

        let clinic_name = self.clinic_name(clinic_id).await;
        let ctx = MessageContext::from_details(&details, clinic_name.as_deref());

        send_with_timeout(self.notifier.as_ref(), self.timeout_secs, &phone, &reminder(&ctx))
            .await
            .map_err(|e| AppointmentError::NotificationFailed(e.to_string()))?;

        info!("Reminder sent for appointment {}", appointment_id);
        Ok(())
    }

    /// Asks every patient with an AGENDADO appointment tomorrow to reply
    /// CONFIRMAR or CANCELAR. One failed send never stops the batch.
    #[instrument(skip(self))]
    pub async fn send_confirmations(&self, clinic_id: Uuid) -> Result<ConfirmationSummary, AppointmentError> {
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let filter = AppointmentFilter {
            date: Some(tomorrow),
            profissional_id: None,
            status: Some(AppointmentStatus::Agendado),
        };

        let appointments = self.store.list_appointments(clinic_id, &filter).await?;
        info!("{} appointments on {} awaiting confirmation", appointments.len(), tomorrow);

        let clinic_name = self.clinic_name(clinic_id).await;
        let mut summary = ConfirmationSummary::default();

        for details in &appointments {
            let patient_name = details.patient.as_ref().map(|p| p.name.clone());
            let appointment_id = details.appointment.id;

            let Some(phone) = Self::patient_phone(details) else {
                warn!("Appointment {} has no patient phone, skipping", appointment_id);
                summary.record(ConfirmationDelivery {
                    appointment_id,
                    patient_name,
                    status: DeliveryStatus::Skipped,
                    error: Some(AppointmentError::MissingPhone.to_string()),
                });
                continue;
            };

            let ctx = MessageContext::from_details(details, clinic_name.as_deref());
            let delivery = match send_with_timeout(
                self.notifier.as_ref(),
                self.timeout_secs,
                &phone,
                &confirmation_request(&ctx),
            )
            .await
            {
                Ok(_) => ConfirmationDelivery {
                    appointment_id,
                    patient_name,
                    status: DeliveryStatus::Sent,
                    error: None,
                },
                Err(e) => {
                    warn!("Confirmation request for appointment {} failed: {}", appointment_id, e);
                    ConfirmationDelivery {
                        appointment_id,
                        patient_name,
                        status: DeliveryStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            summary.record(delivery);
        }

        info!(
            "Confirmation batch done: {} sent, {} failed, {} skipped",
            summary.sent, summary.failed, summary.skipped
        );
        Ok(summary)
    }
}
