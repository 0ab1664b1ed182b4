use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_database::MemoryStore;
use shared_models::auth::User;
use shared_models::notification::{Ack, NotificationDispatcher, NotificationError};
use shared_models::{Clinic, Patient, PatientStatus, Professional, WorkingDay};

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub evolution_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            evolution_api_url: "http://localhost:8080".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            evolution_api_url: self.evolution_api_url.clone(),
            evolution_api_instance: "clinica-teste".to_string(),
            evolution_api_key: "test-evolution-key".to_string(),
            notification_timeout_secs: 2,
            store_backend: StoreBackend::Memory,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub clinic_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "authenticated".to_string(),
            clinic_id: None,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, clinic_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            clinic_id,
        }
    }

    pub fn staff(email: &str, clinic_id: Option<Uuid>) -> Self {
        Self::new(email, "authenticated", clinic_id)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            clinic_id: self.clinic_id,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let app_metadata = match user.clinic_id {
            Some(clinic_id) => json!({ "provider": "email", "clinic_id": clinic_id.to_string() }),
            None => json!({ "provider": "email" }),
        };

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": app_metadata,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

// ==============================================================================
// NOTIFICATION FAKE
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub phone: String,
    pub message: String,
}

/// Dispatcher that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failure: Option<NotificationError>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records attempts but answers every send with `error`.
    pub fn failing(error: NotificationError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<Ack, NotificationError> {
        self.sent.lock().expect("notifier mutex poisoned").push(SentMessage {
            phone: phone.to_string(),
            message: message.to_string(),
        });

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(Ack {
                message_id: Some(format!("TEST-{}", Uuid::new_v4())),
            }),
        }
    }
}

// ==============================================================================
// SEEDED CONTEXT
// ==============================================================================

/// A clinic seeded into a `MemoryStore`, with a signed-in staff user.
pub struct TestContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clinic: Clinic,
    pub user: TestUser,
    pub token: String,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new()).await
    }

    pub async fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(TestConfig::default().to_app_config(), notifier).await
    }

    pub async fn build(config: AppConfig, notifier: RecordingNotifier) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clinic = Clinic {
            id: Uuid::new_v4(),
            name: "Clínica Central".to_string(),
            cnpj: None,
            phone: Some("1133334444".to_string()),
            email: Some("contato@clinica.com".to_string()),
            address: None,
        };
        store.add_clinic(clinic.clone()).await;

        let user = TestUser::staff("recepcao@clinica.com", Some(clinic.id));
        let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, None);

        Self {
            config: Arc::new(config),
            store,
            notifier: Arc::new(notifier),
            clinic,
            user,
            token,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.config.clone(), self.store.clone(), self.notifier.clone())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub async fn seed_patient(&self, name: &str, cpf: &str, phone: Option<&str>) -> Patient {
        use shared_database::SchedulingStore;

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            clinic_id: self.clinic.id,
            name: name.to_string(),
            cpf: cpf.to_string(),
            phone: phone.map(str::to_string),
            email: None,
            address: None,
            status: PatientStatus::Ativo,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_patient(patient, self.config.cpf_uniqueness)
            .await
            .expect("seed patient")
    }

    /// Seeds a professional working `start..end` on each of `days`.
    pub async fn seed_professional(&self, name: &str, days: &[u8], start: &str, end: &str) -> Professional {
        use shared_database::SchedulingStore;

        let parse = |raw: &str| NaiveTime::parse_from_str(raw, "%H:%M").expect("HH:MM literal");
        let now = Utc::now();
        let professional = Professional {
            id: Uuid::new_v4(),
            clinic_id: self.clinic.id,
            name: name.to_string(),
            specialty: Some("Clínico Geral".to_string()),
            phone: None,
            email: None,
            crm: None,
            working_days: days
                .iter()
                .map(|day| WorkingDay {
                    day_of_week: *day,
                    start_time: parse(start),
                    end_time: parse(end),
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_professional(professional)
            .await
            .expect("seed professional")
    }
}

// ==============================================================================
// EVOLUTION API PAYLOADS
// ==============================================================================

pub struct MockEvolutionPayloads;

impl MockEvolutionPayloads {
    pub fn text_message(phone: &str, text: &str) -> serde_json::Value {
        json!({
            "event": "messages.upsert",
            "instance": "clinica-teste",
            "data": {
                "key": {
                    "remoteJid": format!("{}@s.whatsapp.net", phone),
                    "fromMe": false,
                    "id": format!("MSG-{}", Uuid::new_v4())
                },
                "pushName": "Paciente",
                "message": { "conversation": text }
            }
        })
    }

    pub fn button_reply(phone: &str, button_id: &str) -> serde_json::Value {
        json!({
            "event": "messages.upsert",
            "instance": "clinica-teste",
            "data": {
                "key": {
                    "remoteJid": format!("{}@s.whatsapp.net", phone),
                    "fromMe": false,
                    "id": format!("MSG-{}", Uuid::new_v4())
                },
                "pushName": "Paciente",
                "message": {
                    "buttonsResponseMessage": { "selectedButtonId": button_id }
                }
            }
        })
    }

    pub fn send_text_ack() -> serde_json::Value {
        json!({
            "key": {
                "remoteJid": "5511999990000@s.whatsapp.net",
                "fromMe": true,
                "id": "BAE5F5A632EAE722"
            },
            "status": "PENDING"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.store_backend, StoreBackend::Memory);
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let clinic = Uuid::new_v4();
        let user = TestUser::staff("doc@example.com", Some(clinic));

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.clinic_id, Some(clinic));
        assert_eq!(user_model.id, user.id);
    }

    #[tokio::test]
    async fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.send("11999990000", "primeira").await.unwrap();
        notifier.send("11999990000", "segunda").await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].message, "segunda");
    }

    #[tokio::test]
    async fn failing_notifier_still_records() {
        let notifier = RecordingNotifier::failing(NotificationError::Timeout(1));
        assert!(notifier.send("1", "x").await.is_err());
        assert_eq!(notifier.sent().len(), 1);
    }
}
