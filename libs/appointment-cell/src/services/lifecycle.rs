use tracing::{debug, warn};

use shared_models::AppointmentStatus;

use crate::models::AppointmentError;

/// Manual status changes made by clinic staff.
pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Agendado => vec![
                AppointmentStatus::Confirmado,
                AppointmentStatus::Cancelado,
                AppointmentStatus::EmAndamento,
            ],
            AppointmentStatus::Confirmado => vec![
                AppointmentStatus::EmAndamento,
                AppointmentStatus::Cancelado,
            ],
            AppointmentStatus::EmAndamento => vec![AppointmentStatus::Finalizado],
            // Terminal states
            AppointmentStatus::Cancelado | AppointmentStatus::Finalizado => vec![],
        }
    }
}
