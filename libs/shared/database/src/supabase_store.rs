use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::{AppConfig, CpfScope};
use shared_models::{
    time_format::{format_hhmm, hhmm},
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus, Clinic, Patient,
    PatientStatus, PatientSummary, Professional, ProfessionalSummary, WorkingDay,
};

use crate::store::{SchedulingStore, StoreError, StoreResult};
use crate::supabase::{SupabaseApiError, SupabaseClient};

const PROFESSIONAL_SELECT: &str = "*,working_days(day_of_week,start_time,end_time)";
const DETAILS_SELECT: &str =
    "*,patient:patients(id,name,phone,email),profissional:profissionals(id,name,specialty)";
const PHONE_DETAILS_SELECT: &str =
    "*,patient:patients!inner(id,name,phone,email),profissional:profissionals(id,name,specialty)";

// ==============================================================================
// ROW SHAPES (snake_case as stored)
// ==============================================================================

#[derive(Debug, Deserialize)]
struct PatientRow {
    id: Uuid,
    clinic_id: Uuid,
    name: String,
    cpf: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    #[serde(default)]
    status: PatientStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            clinic_id: row.clinic_id,
            name: row.name,
            cpf: row.cpf,
            phone: row.phone,
            email: row.email,
            address: row.address,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkingDayRow {
    day_of_week: u8,
    #[serde(with = "hhmm")]
    start_time: NaiveTime,
    #[serde(with = "hhmm")]
    end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
struct ProfessionalRow {
    id: Uuid,
    clinic_id: Uuid,
    name: String,
    specialty: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    crm: Option<String>,
    #[serde(default)]
    working_days: Vec<WorkingDayRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfessionalRow> for Professional {
    fn from(row: ProfessionalRow) -> Self {
        let mut working_days: Vec<WorkingDay> = row
            .working_days
            .into_iter()
            .map(|day| WorkingDay {
                day_of_week: day.day_of_week,
                start_time: day.start_time,
                end_time: day.end_time,
            })
            .collect();
        working_days.sort_by_key(|day| day.day_of_week);

        Professional {
            id: row.id,
            clinic_id: row.clinic_id,
            name: row.name,
            specialty: row.specialty,
            phone: row.phone,
            email: row.email,
            crm: row.crm,
            working_days,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    clinic_id: Uuid,
    patient_id: Uuid,
    profissional_id: Uuid,
    date: NaiveDate,
    #[serde(with = "hhmm")]
    time: NaiveTime,
    status: AppointmentStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    patient: Option<PatientSummary>,
    #[serde(default)]
    profissional: Option<ProfessionalSummary>,
}

impl From<AppointmentRow> for AppointmentDetails {
    fn from(row: AppointmentRow) -> Self {
        AppointmentDetails {
            appointment: Appointment {
                id: row.id,
                clinic_id: row.clinic_id,
                patient_id: row.patient_id,
                profissional_id: row.profissional_id,
                date: row.date,
                time: row.time,
                status: row.status,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            patient: row.patient,
            profissional: row.profissional,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimeRow {
    #[serde(with = "hhmm")]
    time: NaiveTime,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

fn patient_body(patient: &Patient) -> Value {
    json!({
        "id": patient.id,
        "clinic_id": patient.clinic_id,
        "name": patient.name,
        "cpf": patient.cpf,
        "phone": patient.phone,
        "email": patient.email,
        "address": patient.address,
        "status": patient.status,
        "created_at": patient.created_at,
        "updated_at": patient.updated_at,
    })
}

fn professional_body(professional: &Professional) -> Value {
    json!({
        "id": professional.id,
        "clinic_id": professional.clinic_id,
        "name": professional.name,
        "specialty": professional.specialty,
        "phone": professional.phone,
        "email": professional.email,
        "crm": professional.crm,
        "created_at": professional.created_at,
        "updated_at": professional.updated_at,
    })
}

fn working_days_body(professional: &Professional) -> Value {
    Value::Array(
        professional
            .working_days
            .iter()
            .map(|day| {
                json!({
                    "profissional_id": professional.id,
                    "day_of_week": day.day_of_week,
                    "start_time": format_hhmm(&day.start_time),
                    "end_time": format_hhmm(&day.end_time),
                })
            })
            .collect(),
    )
}

fn appointment_body(appointment: &Appointment) -> Value {
    json!({
        "id": appointment.id,
        "clinic_id": appointment.clinic_id,
        "patient_id": appointment.patient_id,
        "profissional_id": appointment.profissional_id,
        "date": appointment.date.format("%Y-%m-%d").to_string(),
        "time": format_hhmm(&appointment.time),
        "status": appointment.status,
        "notes": appointment.notes,
        "created_at": appointment.created_at,
        "updated_at": appointment.updated_at,
    })
}

fn api_error(err: &anyhow::Error) -> Option<&SupabaseApiError> {
    err.downcast_ref::<SupabaseApiError>()
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    api_error(err).is_some_and(SupabaseApiError::is_unique_violation)
}

fn search_clause(fields: &[&str], term: Option<&str>) -> String {
    match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => {
            // PostgREST reserves these inside or=(...)
            let cleaned: String = term.chars().filter(|c| !matches!(c, ',' | '(' | ')' | '*')).collect();
            let pattern = urlencoding::encode(&format!("*{}*", cleaned)).into_owned();
            let clauses: Vec<String> = fields.iter().map(|f| format!("{}.ilike.{}", f, pattern)).collect();
            format!("&or=({})", clauses.join(","))
        }
        None => String::new(),
    }
}

/// PostgREST-backed store. Slot exclusivity is enforced by the
/// `appointments_active_slot_key` partial unique index.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: SupabaseClient::new(config),
        }
    }

    async fn fetch_appointments(&self, path: &str) -> StoreResult<Vec<AppointmentDetails>> {
        let rows: Vec<AppointmentRow> = self.client.request(Method::GET, path, None, None).await?;
        Ok(rows.into_iter().map(AppointmentDetails::from).collect())
    }

    async fn cpf_taken_globally(&self, cpf: &str, exclude: Option<Uuid>) -> StoreResult<bool> {
        let mut path = format!(
            "/rest/v1/patients?cpf=eq.{}&select=id&limit=1",
            urlencoding::encode(cpf)
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }
        let rows: Vec<IdRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_working_days(&self, professional: &Professional) -> StoreResult<()> {
        if professional.working_days.is_empty() {
            return Ok(());
        }
        let _: Value = self
            .client
            .request(
                Method::POST,
                "/rest/v1/working_days",
                None,
                Some(working_days_body(professional)),
            )
            .await?;
        Ok(())
    }

    async fn patch_professional(&self, professional: &Professional) -> StoreResult<()> {
        let path = format!(
            "/rest/v1/profissionals?id=eq.{}&clinic_id=eq.{}",
            professional.id, professional.clinic_id
        );
        let mut body = professional_body(professional);
        if let Some(map) = body.as_object_mut() {
            map.remove("id");
            map.remove("created_at");
        }

        let rows: Vec<IdRow> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("professional {}", professional.id)));
        }
        Ok(())
    }

    /// Puts back the row and, when they were already cleared, the rules a
    /// failed update replaced.
    async fn restore_professional(&self, previous: &Professional, rules_cleared: bool) {
        if let Err(e) = self.patch_professional(previous).await {
            warn!("Restoring professional {} failed: {}", previous.id, e);
        }
        if rules_cleared {
            if let Err(e) = self.insert_working_days(previous).await {
                warn!("Restoring working days of {} failed: {}", previous.id, e);
            }
        }
    }

    async fn slot_taken_for(&self, appointment_id: Uuid) -> StoreError {
        match self.find_appointment(appointment_id).await {
            Ok(Some(details)) => StoreError::SlotTaken {
                profissional_id: details.appointment.profissional_id,
                date: details.appointment.date,
                time: details.appointment.time,
            },
            Ok(None) => StoreError::NotFound(format!("appointment {}", appointment_id)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn get_clinic(&self, clinic_id: Uuid) -> StoreResult<Option<Clinic>> {
        let path = format!("/rest/v1/clinics?id=eq.{}&select=id,name,cnpj,phone,email,address", clinic_id);
        let rows: Vec<Clinic> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient> {
        // The per-clinic index exists in the schema; global scope is checked here.
        if cpf_scope == CpfScope::Global && self.cpf_taken_globally(&patient.cpf, None).await? {
            return Err(StoreError::Duplicate { field: "cpf".to_string() });
        }

        let result: anyhow::Result<Vec<PatientRow>> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                None,
                Some(patient_body(&patient)),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(Patient::from)
                .ok_or_else(|| StoreError::Backend("patient insert returned no row".to_string())),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate { field: "cpf".to_string() }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_patient(&self, patient: Patient, cpf_scope: CpfScope) -> StoreResult<Patient> {
        if cpf_scope == CpfScope::Global
            && self.cpf_taken_globally(&patient.cpf, Some(patient.id)).await?
        {
            return Err(StoreError::Duplicate { field: "cpf".to_string() });
        }

        let path = format!(
            "/rest/v1/patients?id=eq.{}&clinic_id=eq.{}",
            patient.id, patient.clinic_id
        );
        let result: anyhow::Result<Vec<PatientRow>> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(patient_body(&patient)),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(Patient::from)
                .ok_or_else(|| StoreError::NotFound(format!("patient {}", patient.id))),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate { field: "cpf".to_string() }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_patient(&self, clinic_id: Uuid, patient_id: Uuid) -> StoreResult<Option<Patient>> {
        let path = format!("/rest/v1/patients?id=eq.{}&clinic_id=eq.{}", patient_id, clinic_id);
        let rows: Vec<PatientRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next().map(Patient::from))
    }

    async fn list_patients(&self, clinic_id: Uuid, search: Option<&str>) -> StoreResult<Vec<Patient>> {
        let path = format!(
            "/rest/v1/patients?clinic_id=eq.{}&order=created_at.desc{}",
            clinic_id,
            search_clause(&["name", "email", "cpf"], search)
        );
        let rows: Vec<PatientRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().map(Patient::from).collect())
    }

    async fn insert_professional(&self, professional: Professional) -> StoreResult<Professional> {
        let _: Value = self
            .client
            .request(
                Method::POST,
                "/rest/v1/profissionals",
                None,
                Some(professional_body(&professional)),
            )
            .await?;

        // No transactions over PostgREST: undo the parent row if the days fail.
        if let Err(e) = self.insert_working_days(&professional).await {
            error!("Failed to store working days for {}: {}", professional.id, e);
            let path = format!("/rest/v1/profissionals?id=eq.{}", professional.id);
            if let Err(cleanup) = self.client.request::<Value>(Method::DELETE, &path, None, None).await {
                warn!("Compensating delete of professional {} failed: {}", professional.id, cleanup);
            }
            return Err(e);
        }

        info!("Professional {} created", professional.id);
        Ok(professional)
    }

    async fn update_professional(&self, professional: Professional) -> StoreResult<Professional> {
        let previous = self
            .get_professional(professional.clinic_id, professional.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("professional {}", professional.id)))?;

        self.patch_professional(&professional).await?;

        let days_path = format!("/rest/v1/working_days?profissional_id=eq.{}", professional.id);
        if let Err(e) = self.client.request::<Value>(Method::DELETE, &days_path, None, None).await {
            error!("Failed to clear working days for {}: {}", professional.id, e);
            self.restore_professional(&previous, false).await;
            return Err(e.into());
        }

        if let Err(e) = self.insert_working_days(&professional).await {
            error!("Failed to replace working days for {}: {}", professional.id, e);
            self.restore_professional(&previous, true).await;
            return Err(e);
        }

        info!("Professional {} updated", professional.id);
        Ok(professional)
    }

    async fn get_professional(
        &self,
        clinic_id: Uuid,
        profissional_id: Uuid,
    ) -> StoreResult<Option<Professional>> {
        let path = format!(
            "/rest/v1/profissionals?id=eq.{}&clinic_id=eq.{}&select={}",
            profissional_id, clinic_id, PROFESSIONAL_SELECT
        );
        let rows: Vec<ProfessionalRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next().map(Professional::from))
    }

    async fn list_professionals(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Professional>> {
        let path = format!(
            "/rest/v1/profissionals?clinic_id=eq.{}&select={}&order=name.asc{}",
            clinic_id,
            PROFESSIONAL_SELECT,
            search_clause(&["name", "specialty", "email", "crm"], search)
        );
        let rows: Vec<ProfessionalRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().map(Professional::from).collect())
    }

    async fn delete_professional(&self, clinic_id: Uuid, profissional_id: Uuid) -> StoreResult<bool> {
        let path = format!(
            "/rest/v1/profissionals?id=eq.{}&clinic_id=eq.{}",
            profissional_id, clinic_id
        );
        let rows: Vec<IdRow> = self
            .client
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<AppointmentDetails> {
        let path = format!("/rest/v1/appointments?select={}", DETAILS_SELECT);
        let result: anyhow::Result<Vec<AppointmentRow>> = self
            .client
            .request_with_headers(
                Method::POST,
                &path,
                None,
                Some(appointment_body(&appointment)),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(AppointmentDetails::from)
                .ok_or_else(|| StoreError::Backend("appointment insert returned no row".to_string())),
            Err(e) if is_unique_violation(&e) => {
                debug!("Unique index rejected appointment {}", appointment.id);
                Err(StoreError::SlotTaken {
                    profissional_id: appointment.profissional_id,
                    date: appointment.date,
                    time: appointment.time,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn booked_times(&self, profissional_id: Uuid, date: NaiveDate) -> StoreResult<Vec<NaiveTime>> {
        let path = format!(
            "/rest/v1/appointments?profissional_id=eq.{}&date=eq.{}&status=neq.{}&select=time&order=time.asc",
            profissional_id,
            date.format("%Y-%m-%d"),
            AppointmentStatus::Cancelado
        );
        let rows: Vec<TimeRow> = self.client.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().map(|row| row.time).collect())
    }

    async fn list_appointments(
        &self,
        clinic_id: Uuid,
        filter: &AppointmentFilter,
    ) -> StoreResult<Vec<AppointmentDetails>> {
        let mut path = format!(
            "/rest/v1/appointments?clinic_id=eq.{}&select={}&order=date.asc,time.asc",
            clinic_id, DETAILS_SELECT
        );
        if let Some(date) = filter.date {
            path.push_str(&format!("&date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(id) = filter.profissional_id {
            path.push_str(&format!("&profissional_id=eq.{}", id));
        }
        if let Some(status) = filter.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        self.fetch_appointments(&path).await
    }

    async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> StoreResult<Option<AppointmentDetails>> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}&select={}",
            appointment_id, clinic_id, DETAILS_SELECT
        );
        Ok(self.fetch_appointments(&path).await?.into_iter().next())
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<AppointmentDetails>> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, DETAILS_SELECT);
        Ok(self.fetch_appointments(&path).await?.into_iter().next())
    }

    async fn pending_appointments_for_phone(
        &self,
        phone_digits: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<AppointmentDetails>> {
        if phone_digits.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!(
            "/rest/v1/appointments?select={}&status=eq.{}&date=gte.{}&patient.phone_digits=like.*{}*&order=date.asc,time.asc",
            PHONE_DETAILS_SELECT,
            AppointmentStatus::Agendado,
            from.format("%Y-%m-%d"),
            phone_digits
        );
        self.fetch_appointments(&path).await
    }

    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Option<AppointmentDetails>> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}&select={}",
            appointment_id, expected, DETAILS_SELECT
        );
        let body = json!({ "status": next, "updated_at": Utc::now() });

        let result: anyhow::Result<Vec<AppointmentRow>> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => Ok(rows.into_iter().next().map(AppointmentDetails::from)),
            Err(e) if is_unique_violation(&e) => Err(self.slot_taken_for(appointment_id).await),
            Err(e) => Err(e.into()),
        }
    }
}
