use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::CpfScope;
use shared_database::SharedStore;
use shared_models::Patient;
use shared_utils::AppState;

use crate::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};

pub struct PatientService {
    store: SharedStore,
    cpf_scope: CpfScope,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `Some("")` clears the field, `None` keeps `current`.
fn patch(current: Option<String>, update: Option<String>) -> Option<String> {
    match update {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.trim().to_string()),
        None => current,
    }
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            cpf_scope: state.config.cpf_uniqueness,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_patient(
        &self,
        clinic_id: Uuid,
        request: CreatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let (Some(name), Some(cpf)) = (required(request.name), required(request.cpf)) else {
            return Err(PatientError::ValidationError("Name and CPF are required".to_string()));
        };

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            clinic_id,
            name,
            cpf,
            phone: required(request.phone),
            email: required(request.email),
            address: required(request.address),
            status: request.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let patient = self.store.insert_patient(patient, self.cpf_scope).await?;
        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, clinic_id: Uuid, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        self.store
            .get_patient(clinic_id, patient_id)
            .await?
            .ok_or(PatientError::NotFound)
    }

    #[instrument(skip(self, request))]
    pub async fn update_patient(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let existing = self.get_patient(clinic_id, patient_id).await?;

        let updated = Patient {
            name: required(request.name).unwrap_or(existing.name),
            cpf: required(request.cpf).unwrap_or(existing.cpf),
            phone: patch(existing.phone, request.phone),
            email: patch(existing.email, request.email),
            address: patch(existing.address, request.address),
            status: request.status.unwrap_or(existing.status),
            updated_at: Utc::now(),
            ..existing
        };

        Ok(self.store.update_patient(updated, self.cpf_scope).await?)
    }

    pub async fn search_patients(
        &self,
        clinic_id: Uuid,
        query: PatientSearchQuery,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        Ok(self.store.list_patients(clinic_id, query.search.as_deref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_clears_on_empty_and_keeps_on_absent() {
        assert_eq!(patch(Some("a".into()), None), Some("a".to_string()));
        assert_eq!(patch(Some("a".into()), Some("  ".into())), None);
        assert_eq!(patch(None, Some(" b ".into())), Some("b".to_string()));
    }
}
