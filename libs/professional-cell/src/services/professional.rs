use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::time_format::parse_hhmm;
use shared_models::{Professional, WorkingDay};
use shared_utils::AppState;

use crate::models::{
    CreateProfessionalRequest, ProfessionalError, ProfessionalSearchQuery, UpdateProfessionalRequest,
    WorkingDayInput,
};

pub struct ProfessionalService {
    store: SharedStore,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Checks each rule and collapses repeated weekdays, the last entry winning.
/// Output is ordered by weekday.
pub fn validate_working_days(input: &[WorkingDayInput]) -> Result<Vec<WorkingDay>, ProfessionalError> {
    let mut by_day: BTreeMap<u8, WorkingDay> = BTreeMap::new();

    for rule in input {
        let day_of_week = u8::try_from(rule.day_of_week)
            .ok()
            .filter(|day| *day <= 6)
            .ok_or_else(|| {
                ProfessionalError::ValidationError(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                )
            })?;

        let (Some(start_time), Some(end_time)) = (parse_hhmm(&rule.start_time), parse_hhmm(&rule.end_time))
        else {
            return Err(ProfessionalError::ValidationError(
                "Working hours must use the HH:MM format".to_string(),
            ));
        };

        if start_time >= end_time {
            return Err(ProfessionalError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }

        if by_day
            .insert(day_of_week, WorkingDay { day_of_week, start_time, end_time })
            .is_some()
        {
            warn!("Duplicate working day {} submitted, keeping the last one", day_of_week);
        }
    }

    Ok(by_day.into_values().collect())
}

impl ProfessionalService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    fn build(
        id: Uuid,
        clinic_id: Uuid,
        request: CreateProfessionalRequest,
    ) -> Result<Professional, ProfessionalError> {
        let name = clean(request.name)
            .ok_or_else(|| ProfessionalError::ValidationError("Nome é obrigatório".to_string()))?;
        let working_days = validate_working_days(&request.working_days)?;
        let now = Utc::now();

        Ok(Professional {
            id,
            clinic_id,
            name,
            specialty: clean(request.specialty),
            phone: clean(request.phone),
            email: clean(request.email),
            crm: clean(request.crm),
            working_days,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn create_professional(
        &self,
        clinic_id: Uuid,
        request: CreateProfessionalRequest,
    ) -> Result<Professional, ProfessionalError> {
        let professional = Self::build(Uuid::new_v4(), clinic_id, request)?;
        let professional = self.store.insert_professional(professional).await?;

        info!(
            "Professional {} created with {} working days",
            professional.id,
            professional.working_days.len()
        );
        Ok(professional)
    }

    pub async fn get_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
    ) -> Result<Professional, ProfessionalError> {
        self.store
            .get_professional(clinic_id, profissional_id)
            .await?
            .ok_or(ProfessionalError::NotFound)
    }

    #[instrument(skip(self, request))]
    pub async fn update_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
        request: UpdateProfessionalRequest,
    ) -> Result<Professional, ProfessionalError> {
        let existing = self.get_professional(clinic_id, profissional_id).await?;

        let mut professional = Self::build(profissional_id, clinic_id, request)?;
        professional.created_at = existing.created_at;

        Ok(self.store.update_professional(professional).await?)
    }

    /// Removes the professional and its rules; appointments stay as history.
    #[instrument(skip(self))]
    pub async fn delete_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
    ) -> Result<(), ProfessionalError> {
        if !self.store.delete_professional(clinic_id, profissional_id).await? {
            return Err(ProfessionalError::NotFound);
        }
        info!("Professional {} deleted", profissional_id);
        Ok(())
    }

    pub async fn search_professionals(
        &self,
        clinic_id: Uuid,
        query: ProfessionalSearchQuery,
    ) -> Result<Vec<Professional>, ProfessionalError> {
        debug!("Searching professionals with query: {:?}", query);
        Ok(self
            .store
            .list_professionals(clinic_id, query.search.as_deref())
            .await?)
    }
}
