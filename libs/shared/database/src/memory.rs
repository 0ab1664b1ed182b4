use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::CpfScope;
use shared_models::{
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus, Clinic, Patient,
    Professional, SlotKey,
};

use crate::store::{digits_only, SchedulingStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    clinics: HashMap<Uuid, Clinic>,
    patients: HashMap<Uuid, Patient>,
    professionals: HashMap<Uuid, Professional>,
    appointments: HashMap<Uuid, Appointment>,
    /// Partial unique index: slot -> id of the non-cancelled appointment holding it.
    active_slots: HashMap<SlotKey, Uuid>,
}

impl Tables {
    fn details(&self, appointment: &Appointment) -> AppointmentDetails {
        AppointmentDetails {
            appointment: appointment.clone(),
            patient: self.patients.get(&appointment.patient_id).map(Patient::summary),
            profissional: self
                .professionals
                .get(&appointment.profissional_id)
                .map(Professional::summary),
        }
    }

    fn cpf_taken(&self, patient: &Patient, scope: CpfScope) -> bool {
        self.patients.values().any(|existing| {
            existing.id != patient.id
                && existing.cpf == patient.cpf
                && (scope == CpfScope::Global || existing.clinic_id == patient.clinic_id)
        })
    }

    fn slot_taken(key: &SlotKey) -> StoreError {
        StoreError::SlotTaken {
            profissional_id: key.profissional_id,
            date: key.date,
            time: key.time,
        }
    }
}

/// In-process store. Every check-then-write runs under one write lock, which
/// gives the same serialization as the database's unique index.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clinics are provisioned outside the API; this seeds one.
    pub async fn add_clinic(&self, clinic: Clinic) {
        self.tables.write().await.clinics.insert(clinic.id, clinic);
    }
}

fn matches_search(search: Option<&str>, fields: &[Option<&str>]) -> bool {
    let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) else {
        return true;
    };
    let term = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&term))
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn get_clinic(&self, clinic_id: Uuid) -> StoreResult<Option<Clinic>> {
        Ok(self.tables.read().await.clinics.get(&clinic_id).cloned())
    }

    async fn insert_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient> {
        let mut tables = self.tables.write().await;
        if tables.cpf_taken(&patient, cpf_scope) {
            return Err(StoreError::Duplicate { field: "cpf".to_string() });
        }
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn update_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .patients
            .get(&patient.id)
            .is_some_and(|existing| existing.clinic_id == patient.clinic_id);
        if !exists {
            return Err(StoreError::NotFound(format!("patient {}", patient.id)));
        }
        if tables.cpf_taken(&patient, cpf_scope) {
            return Err(StoreError::Duplicate { field: "cpf".to_string() });
        }
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, clinic_id: Uuid, patient_id: Uuid) -> StoreResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables
            .patients
            .get(&patient_id)
            .filter(|p| p.clinic_id == clinic_id)
            .cloned())
    }

    async fn list_patients(&self, clinic_id: Uuid, search: Option<&str>) -> StoreResult<Vec<Patient>> {
        let tables = self.tables.read().await;
        let mut patients: Vec<Patient> = tables
            .patients
            .values()
            .filter(|p| p.clinic_id == clinic_id)
            .filter(|p| {
                matches_search(search, &[Some(p.name.as_str()), p.email.as_deref(), Some(p.cpf.as_str())])
            })
            .cloned()
            .collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(patients)
    }

    async fn insert_professional(&self, professional: Professional) -> StoreResult<Professional> {
        let mut tables = self.tables.write().await;
        tables.professionals.insert(professional.id, professional.clone());
        Ok(professional)
    }

    async fn update_professional(&self, professional: Professional) -> StoreResult<Professional> {
        let mut tables = self.tables.write().await;
        match tables.professionals.get_mut(&professional.id) {
            Some(existing) if existing.clinic_id == professional.clinic_id => {
                *existing = professional.clone();
                Ok(professional)
            }
            _ => Err(StoreError::NotFound(format!("professional {}", professional.id))),
        }
    }

    async fn get_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
    ) -> StoreResult<Option<Professional>> {
        let tables = self.tables.read().await;
        Ok(tables
            .professionals
            .get(&profissional_id)
            .filter(|p| p.clinic_id == clinic_id)
            .cloned())
    }

    async fn list_professionals(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Professional>> {
        let tables = self.tables.read().await;
        let mut professionals: Vec<Professional> = tables
            .professionals
            .values()
            .filter(|p| p.clinic_id == clinic_id)
            .filter(|p| {
                matches_search(
                    search,
                    &[Some(p.name.as_str()), p.specialty.as_deref(), p.email.as_deref(), p.crm.as_deref()],
                )
            })
            .cloned()
            .collect();
        professionals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(professionals)
    }

    async fn delete_professional(&self, clinic_id: Uuid, profissional_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .professionals
            .get(&profissional_id)
            .is_some_and(|p| p.clinic_id == clinic_id);
        if owned {
            tables.professionals.remove(&profissional_id);
        }
        Ok(owned)
    }

    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<AppointmentDetails> {
        let mut tables = self.tables.write().await;
        let key = appointment.slot_key();

        if appointment.status.occupies_slot() {
            if tables.active_slots.contains_key(&key) {
                debug!("Slot {:?} already held", key);
                return Err(Tables::slot_taken(&key));
            }
            tables.active_slots.insert(key, appointment.id);
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(tables.details(&appointment))
    }

    async fn booked_times(&self, profissional_id: Uuid, date: NaiveDate) -> StoreResult<Vec<NaiveTime>> {
        let tables = self.tables.read().await;
        let mut times: Vec<NaiveTime> = tables
            .active_slots
            .keys()
            .filter(|key| key.profissional_id == profissional_id && key.date == date)
            .map(|key| key.time)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn list_appointments(
        &self,
        clinic_id: Uuid,
        filter: &AppointmentFilter,
    ) -> StoreResult<Vec<AppointmentDetails>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<&Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.clinic_id == clinic_id)
            .filter(|a| filter.date.is_none_or(|date| a.date == date))
            .filter(|a| filter.profissional_id.is_none_or(|id| a.profissional_id == id))
            .filter(|a| filter.status.is_none_or(|status| a.status == status))
            .collect();
        appointments.sort_by_key(|a| (a.date, a.time));
        Ok(appointments.into_iter().map(|a| tables.details(a)).collect())
    }

    async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> StoreResult<Option<AppointmentDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .appointments
            .get(&appointment_id)
            .filter(|a| a.clinic_id == clinic_id)
            .map(|a| tables.details(a)))
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<AppointmentDetails>> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.get(&appointment_id).map(|a| tables.details(a)))
    }

    async fn pending_appointments_for_phone(
        &self,
        phone_digits: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<AppointmentDetails>> {
        if phone_digits.is_empty() {
            return Ok(Vec::new());
        }

        let tables = self.tables.read().await;
        let mut matches: Vec<&Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.status == AppointmentStatus::Agendado && a.date >= from)
            .filter(|a| {
                tables
                    .patients
                    .get(&a.patient_id)
                    .and_then(|p| p.phone.as_deref())
                    .is_some_and(|phone| digits_only(phone).contains(phone_digits))
            })
            .collect();
        matches.sort_by_key(|a| (a.date, a.time));
        Ok(matches.into_iter().map(|a| tables.details(a)).collect())
    }

    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Option<AppointmentDetails>> {
        let mut tables = self.tables.write().await;

        let Some(current) = tables.appointments.get(&appointment_id).cloned() else {
            return Ok(None);
        };
        if current.status != expected {
            return Ok(None);
        }

        let key = current.slot_key();
        match (expected.occupies_slot(), next.occupies_slot()) {
            (false, true) => {
                if tables.active_slots.contains_key(&key) {
                    return Err(Tables::slot_taken(&key));
                }
                tables.active_slots.insert(key, appointment_id);
            }
            (true, false) => {
                if tables.active_slots.get(&key) == Some(&appointment_id) {
                    tables.active_slots.remove(&key);
                }
            }
            _ => {}
        }

        let updated = match tables.appointments.get_mut(&appointment_id) {
            Some(appointment) => {
                appointment.status = next;
                appointment.updated_at = Utc::now();
                appointment.clone()
            }
            None => return Ok(None),
        };

        Ok(Some(tables.details(&updated)))
    }
}
