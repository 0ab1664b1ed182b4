use serde::{Deserialize, Serialize};

use shared_database::StoreError;

/// Working-day rule as submitted. Kept loose so range and format problems
/// surface as validation errors rather than body rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDayInput {
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfessionalRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub crm: Option<String>,
    #[serde(default)]
    pub working_days: Vec<WorkingDayInput>,
}

/// Full replacement, including the working-day rules.
pub type UpdateProfessionalRequest = CreateProfessionalRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfessionalSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfessionalError {
    #[error("Profissional não encontrado")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for ProfessionalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ProfessionalError::NotFound,
            other => ProfessionalError::DatabaseError(other.to_string()),
        }
    }
}
