use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::notification::NotificationDispatcher;
use shared_models::time_format::parse_hhmm;
use shared_models::{Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus};
use shared_utils::AppState;
use whatsapp_cell::services::messages::booking_confirmation;
use whatsapp_cell::services::MessageContext;
use whatsapp_cell::send_with_timeout;

use crate::models::{AppointmentError, AppointmentListQuery, BookAppointmentRequest, UpdateStatusRequest};
use crate::services::lifecycle::AppointmentLifecycleService;

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| AppointmentError::InvalidDate(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    parse_hhmm(raw).ok_or_else(|| AppointmentError::InvalidTime(raw.to_string()))
}

pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppointmentError::ValidationError(format!("{} inválido", field)))
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct AppointmentBookingService {
    store: SharedStore,
    notifier: Arc<dyn NotificationDispatcher>,
    lifecycle_service: AppointmentLifecycleService,
    notify_on_booking: bool,
    notification_timeout_secs: u64,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            notifier: state.notifier.clone(),
            lifecycle_service: AppointmentLifecycleService::new(),
            notify_on_booking: state.config.notify_on_booking,
            notification_timeout_secs: state.config.notification_timeout_secs,
        }
    }

    /// Books a slot with status AGENDADO.
    ///
    /// The ledger pre-check only produces an early error; the store insert is
    /// what guarantees a single active appointment per slot.
    #[instrument(skip(self, request))]
    pub async fn book_appointment(
        &self,
        clinic_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let (Some(patient_id), Some(profissional_id), Some(date), Some(time)) = (
            present(request.patient_id),
            present(request.profissional_id),
            present(request.date),
            present(request.time),
        ) else {
            return Err(AppointmentError::MissingFields);
        };

        let patient_id = parse_id(&patient_id, "patientId")?;
        let profissional_id = parse_id(&profissional_id, "profissionalId")?;
        let date = parse_date(&date)?;
        let time = parse_time(&time)?;

        info!("Booking appointment for patient {} with professional {}", patient_id, profissional_id);

        if self.store.get_patient(clinic_id, patient_id).await?.is_none() {
            return Err(AppointmentError::PatientNotFound);
        }

        if self.store.get_professional(clinic_id, profissional_id).await?.is_none() {
            return Err(AppointmentError::ProfessionalNotFound);
        }

        if self.store.booked_times(profissional_id, date).await?.contains(&time) {
            warn!("Slot {} {} already booked for professional {}", date, time, profissional_id);
            return Err(AppointmentError::SlotConflict);
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            profissional_id,
            date,
            time,
            status: AppointmentStatus::Agendado,
            notes: present(request.notes),
            created_at: now,
            updated_at: now,
        };

        let details = self.store.insert_appointment(appointment).await?;
        info!("Appointment {} booked for {} {}", details.appointment.id, date, time);

        if self.notify_on_booking {
            self.spawn_booking_notification(details.clone());
        }

        Ok(details)
    }

    /// Fire-and-forget. The booking has already been committed.
    fn spawn_booking_notification(&self, details: AppointmentDetails) {
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let timeout_secs = self.notification_timeout_secs;

        tokio::spawn(async move {
            let appointment_id = details.appointment.id;
            let Some(phone) = details.patient.as_ref().and_then(|p| p.phone.clone()) else {
                debug!("Appointment {} has no patient phone, skipping notification", appointment_id);
                return;
            };

            let clinic_name = match store.get_clinic(details.appointment.clinic_id).await {
                Ok(clinic) => clinic.map(|c| c.name),
                Err(e) => {
                    warn!("Could not load clinic for appointment {}: {}", appointment_id, e);
                    None
                }
            };

            let ctx = MessageContext::from_details(&details, clinic_name.as_deref());
            match send_with_timeout(notifier.as_ref(), timeout_secs, &phone, &booking_confirmation(&ctx)).await {
                Ok(_) => info!("Booking confirmation sent for appointment {}", appointment_id),
                Err(e) => warn!("Booking confirmation for appointment {} failed: {}", appointment_id, e),
            }
        });
    }

    pub async fn list_appointments(
        &self,
        clinic_id: Uuid,
        query: AppointmentListQuery,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let filter = AppointmentFilter {
            date: present(query.date).as_deref().map(parse_date).transpose()?,
            profissional_id: present(query.profissional_id)
                .as_deref()
                .map(|id| parse_id(id, "profissionalId"))
                .transpose()?,
            status: present(query.status)
                .as_deref()
                .map(|s| s.parse::<AppointmentStatus>().map_err(AppointmentError::ValidationError))
                .transpose()?,
        };

        debug!("Listing appointments for clinic {} with {:?}", clinic_id, filter);
        Ok(self.store.list_appointments(clinic_id, &filter).await?)
    }

    pub async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<AppointmentDetails, AppointmentError> {
        self.store
            .get_appointment(clinic_id, appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Staff-driven status change, validated against the lifecycle table and
    /// applied with compare-and-set.
    #[instrument(skip(self, request))]
    pub async fn update_status(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let next = present(request.status)
            .ok_or_else(|| AppointmentError::ValidationError("status é obrigatório".to_string()))?
            .parse::<AppointmentStatus>()
            .map_err(AppointmentError::ValidationError)?;

        let current = self.get_appointment(clinic_id, appointment_id).await?.appointment.status;
        self.lifecycle_service.validate_status_transition(current, next)?;

        match self.store.transition_status(appointment_id, current, next).await? {
            Some(updated) => {
                info!("Appointment {} moved {} -> {}", appointment_id, current, next);
                Ok(updated)
            }
            None => {
                // Someone else changed it between the read and the write.
                let latest = self.get_appointment(clinic_id, appointment_id).await?.appointment.status;
                Err(AppointmentError::InvalidStatusTransition { from: latest, to: next })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_api_date_and_time_forms() {
        assert_eq!(parse_date("2030-03-04").unwrap(), NaiveDate::from_ymd_opt(2030, 3, 4).unwrap());
        assert_eq!(parse_time("14:30").unwrap(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert_eq!(parse_time("14:30:45").unwrap(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert_matches!(parse_date("04/03/2030"), Err(AppointmentError::InvalidDate(_)));
        assert_matches!(parse_time("25:00"), Err(AppointmentError::InvalidTime(_)));
        assert_matches!(parse_id("abc", "patientId"), Err(AppointmentError::ValidationError(_)));
    }
}
