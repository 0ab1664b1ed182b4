use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_utils::AppState;

use crate::models::AppointmentError;
use crate::services::availability::candidate_slots;

/// Free slots of a professional: the weekly grid minus the booking ledger.
pub struct SlotAllocatorService {
    store: SharedStore,
}

impl SlotAllocatorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Point-in-time snapshot in ascending order. A slot listed here can still
    /// be taken before the caller books it.
    #[instrument(skip(self))]
    pub async fn available_times(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        let professional = self
            .store
            .get_professional(clinic_id, profissional_id)
            .await?
            .ok_or(AppointmentError::ProfessionalNotFound)?;

        let grid = candidate_slots(&professional.working_days, date);
        if grid.is_empty() {
            debug!("Professional {} does not work on {}", profissional_id, date);
            return Ok(grid);
        }

        let booked: HashSet<NaiveTime> = self
            .store
            .booked_times(profissional_id, date)
            .await?
            .into_iter()
            .collect();

        let free: Vec<NaiveTime> = grid.into_iter().filter(|slot| !booked.contains(slot)).collect();

        debug!(
            "{} free slots for professional {} on {} ({} booked)",
            free.len(),
            profissional_id,
            date,
            booked.len()
        );
        Ok(free)
    }
}
