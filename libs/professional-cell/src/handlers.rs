use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::Professional;
use shared_utils::{require_clinic, AppState};

use crate::models::{
    CreateProfessionalRequest, ProfessionalError, ProfessionalSearchQuery, UpdateProfessionalRequest,
};
use crate::services::ProfessionalService;

impl From<ProfessionalError> for AppError {
    fn from(err: ProfessionalError) -> Self {
        match err {
            ProfessionalError::NotFound => AppError::NotFound(err.to_string()),
            ProfessionalError::ValidationError(msg) => AppError::ValidationError(msg),
            ProfessionalError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn create_professional(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProfessionalRequest>,
) -> Result<(StatusCode, Json<Professional>), AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ProfessionalService::new(&state);

    let professional = service.create_professional(clinic_id, request).await?;

    Ok((StatusCode::CREATED, Json(professional)))
}

#[axum::debug_handler]
pub async fn get_professional(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(profissional_id): Path<Uuid>,
) -> Result<Json<Professional>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ProfessionalService::new(&state);

    Ok(Json(service.get_professional(clinic_id, profissional_id).await?))
}

#[axum::debug_handler]
pub async fn update_professional(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(profissional_id): Path<Uuid>,
    Json(request): Json<UpdateProfessionalRequest>,
) -> Result<Json<Professional>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ProfessionalService::new(&state);

    Ok(Json(service.update_professional(clinic_id, profissional_id, request).await?))
}

#[axum::debug_handler]
pub async fn delete_professional(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(profissional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ProfessionalService::new(&state);

    service.delete_professional(clinic_id, profissional_id).await?;

    Ok(Json(json!({ "message": "Profissional excluído com sucesso" })))
}

#[axum::debug_handler]
pub async fn search_professionals(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ProfessionalSearchQuery>,
) -> Result<Json<Vec<Professional>>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = ProfessionalService::new(&state);

    Ok(Json(service.search_professionals(clinic_id, query).await?))
}
