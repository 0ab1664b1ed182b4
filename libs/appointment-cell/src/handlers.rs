use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::AppointmentDetails;
use shared_utils::{require_clinic, AppState};

use crate::models::{
    AppointmentError, AppointmentListQuery, AvailableTimesQuery, AvailableTimesResponse,
    BookAppointmentRequest, ConfirmationSummary, UpdateStatusRequest,
};
use crate::services::booking::{parse_date, parse_id};
use crate::services::{AppointmentBookingService, ReminderService, SlotAllocatorService};

/// Booking references that do not resolve are client errors (400); direct
/// lookups that miss are 404s and are mapped at the call site.
impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotConflict => AppError::SlotConflict(err.to_string()),
            AppointmentError::MissingFields
            | AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::PatientNotFound
            | AppointmentError::ProfessionalNotFound
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::MissingPhone => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NotificationFailed(_) => AppError::ExternalService(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_available_times(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<AvailableTimesResponse>, AppError> {
    let clinic_id = require_clinic(&user)?;

    let (Some(profissional_id), Some(date)) = (query.profissional_id, query.date) else {
        return Err(AppError::BadRequest("Profissional e data são obrigatórios".to_string()));
    };
    let profissional_id = parse_id(&profissional_id, "profissionalId")?;
    let date = parse_date(&date)?;

    let service = SlotAllocatorService::new(&state);
    let available_times = service
        .available_times(clinic_id, profissional_id, date)
        .await
        .map_err(|e| match e {
            AppointmentError::ProfessionalNotFound => AppError::NotFound("Profissional não encontrado".to_string()),
            other => other.into(),
        })?;

    Ok(Json(AvailableTimesResponse { available_times }))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentDetails>), AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = AppointmentBookingService::new(&state);

    let details = service.book_appointment(clinic_id, request).await?;

    Ok((StatusCode::CREATED, Json(details)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<AppointmentDetails>>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = AppointmentBookingService::new(&state);

    Ok(Json(service.list_appointments(clinic_id, query).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentDetails>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = AppointmentBookingService::new(&state);

    Ok(Json(service.get_appointment(clinic_id, appointment_id).await?))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<AppointmentDetails>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = AppointmentBookingService::new(&state);

    Ok(Json(service.update_status(clinic_id, appointment_id, request).await?))
}

#[axum::debug_handler]
pub async fn send_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ReminderService::new(&state);

    service.send_reminder(clinic_id, appointment_id).await?;

    Ok(Json(json!({ "message": "Lembrete enviado com sucesso" })))
}

#[axum::debug_handler]
pub async fn send_confirmations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ConfirmationSummary>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ReminderService::new(&state);

    Ok(Json(service.send_confirmations(clinic_id).await?))
}
