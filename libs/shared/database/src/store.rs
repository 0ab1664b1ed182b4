//! Persistence port for the scheduling domain.
//!
//! Every tenant-facing lookup takes a `clinic_id`. The only unscoped reads are
//! `find_appointment` and `pending_appointments_for_phone`, which serve the
//! WhatsApp webhook where the caller is identified by phone instead of a JWT.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_config::CpfScope;
use shared_models::{
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus, Clinic, Patient,
    Professional,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// A non-cancelled appointment already holds `(profissional_id, date, time)`.
    #[error("Slot already booked for professional {profissional_id} on {date} at {time}")]
    SlotTaken {
        profissional_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Duplicate value for {field}")]
    Duplicate { field: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(format!("{:#}", err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn SchedulingStore>;

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    // ---------------------------------------------------------------------
    // Clinics
    // ---------------------------------------------------------------------

    async fn get_clinic(&self, clinic_id: Uuid) -> StoreResult<Option<Clinic>>;

    // ---------------------------------------------------------------------
    // Patients
    // ---------------------------------------------------------------------

    /// Fails with `Duplicate { field: "cpf" }` when the CPF is already taken
    /// within `cpf_scope`.
    async fn insert_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient>;

    async fn update_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient>;

    async fn get_patient(&self, clinic_id: Uuid, patient_id: Uuid) -> StoreResult<Option<Patient>>;

    /// Newest first. `search` matches name, email or CPF case-insensitively.
    async fn list_patients(&self, clinic_id: Uuid, search: Option<&str>) -> StoreResult<Vec<Patient>>;

    // ---------------------------------------------------------------------
    // Professionals
    // ---------------------------------------------------------------------

    async fn insert_professional(&self, professional: Professional) -> StoreResult<Professional>;

    /// Replaces the professional's fields and its whole set of working days.
    async fn update_professional(&self, professional: Professional) -> StoreResult<Professional>;

    async fn get_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
    ) -> StoreResult<Option<Professional>>;

    /// Ordered by name.
    async fn list_professionals(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Professional>>;

    /// Removes the professional and its working days. Appointments are kept.
    /// Returns `false` when nothing matched.
    async fn delete_professional(&self, clinic_id: Uuid, profissional_id: Uuid) -> StoreResult<bool>;

    // ---------------------------------------------------------------------
    // Appointments
    // ---------------------------------------------------------------------

    /// Atomically enforces the partial-unique invariant: fails with
    /// `SlotTaken` if a non-cancelled appointment holds the same slot.
    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<AppointmentDetails>;

    /// Booking ledger: times of the non-cancelled appointments of a
    /// professional on a date.
    async fn booked_times(&self, profissional_id: Uuid, date: NaiveDate) -> StoreResult<Vec<NaiveTime>>;

    /// Ordered by `(date, time)` ascending.
    async fn list_appointments(
        &self,
        clinic_id: Uuid,
        filter: &AppointmentFilter,
    ) -> StoreResult<Vec<AppointmentDetails>>;

    async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> StoreResult<Option<AppointmentDetails>>;

    async fn find_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<AppointmentDetails>>;

    /// AGENDADO appointments dated `from` or later whose patient phone digits
    /// contain `phone_digits`, ordered by `(date, time)` ascending.
    async fn pending_appointments_for_phone(
        &self,
        phone_digits: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<AppointmentDetails>>;

    /// Compare-and-set status change. Returns `None` when the appointment is
    /// missing or its status is no longer `expected`.
    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Option<AppointmentDetails>>;
}

/// Keeps only ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
