use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::time_format::hhmm_vec;
use shared_models::AppointmentStatus;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Query parameters of `GET /appointments/available-times`. Kept as raw
/// strings so missing and malformed values both surface as 400s with a
/// readable message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimesQuery {
    pub profissional_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub patient_id: Option<String>,
    pub profissional_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub date: Option<String>,
    pub profissional_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimesResponse {
    #[serde(with = "hhmm_vec")]
    pub available_times: Vec<NaiveTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationDelivery {
    pub appointment_id: Uuid,
    pub patient_name: Option<String>,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one `send-confirmations` batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<ConfirmationDelivery>,
}

impl ConfirmationSummary {
    pub fn record(&mut self, delivery: ConfirmationDelivery) {
        match delivery.status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Failed => self.failed += 1,
            DeliveryStatus::Skipped => self.skipped += 1,
        }
        self.total += 1;
        self.results.push(delivery);
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Campos obrigatórios: paciente, profissional, data e horário")]
    MissingFields,

    #[error("Data inválida: {0}")]
    InvalidDate(String),

    #[error("Horário inválido: {0}")]
    InvalidTime(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Agendamento não encontrado")]
    NotFound,

    #[error("Paciente não encontrado ou não pertence à clínica")]
    PatientNotFound,

    #[error("Profissional não encontrado ou não pertence à clínica")]
    ProfessionalNotFound,

    #[error("Já existe um agendamento neste horário")]
    SlotConflict,

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Paciente não possui telefone cadastrado")]
    MissingPhone,

    #[error("Falha ao enviar mensagem: {0}")]
    NotificationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotTaken { .. } => AppointmentError::SlotConflict,
            StoreError::NotFound(_) => AppointmentError::NotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
