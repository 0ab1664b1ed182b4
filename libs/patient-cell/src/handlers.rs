use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::Patient;
use shared_utils::{require_clinic, AppState};

use crate::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::CpfAlreadyExists => AppError::BadRequest(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = PatientService::new(&state);

    let patient = service.create_patient(clinic_id, request).await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Patient>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = PatientService::new(&state);

    Ok(Json(service.get_patient(clinic_id, patient_id).await?))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = PatientService::new(&state);

    Ok(Json(service.update_patient(clinic_id, patient_id, request).await?))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = PatientService::new(&state);

    Ok(Json(service.search_patients(clinic_id, query).await?))
}
