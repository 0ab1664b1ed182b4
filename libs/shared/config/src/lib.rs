use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where patient CPF numbers must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CpfScope {
    /// Unique across every clinic in the store.
    #[default]
    Global,
    /// Unique inside a single clinic only.
    Clinic,
}

impl FromStr for CpfScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(CpfScope::Global),
            "clinic" | "per_clinic" | "tenant" => Ok(CpfScope::Clinic),
            other => Err(format!("unknown CPF uniqueness scope: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" | "postgres" => Ok(StoreBackend::Supabase),
            "memory" | "in_memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Supabase => write!(f, "supabase"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub evolution_api_url: String,
    pub evolution_api_instance: String,
    pub evolution_api_key: String,
    pub notification_timeout_secs: u64,
    pub notify_on_booking: bool,
    pub cpf_uniqueness: CpfScope,
    pub store_backend: StoreBackend,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            evolution_api_url: String::new(),
            evolution_api_instance: String::new(),
            evolution_api_key: String::new(),
            notification_timeout_secs: 10,
            notify_on_booking: false,
            cpf_uniqueness: CpfScope::Global,
            store_backend: StoreBackend::Supabase,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: required_var("SUPABASE_URL"),
            supabase_anon_key: required_var("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_service_role_key: required_var("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret: required_var("SUPABASE_JWT_SECRET"),
            evolution_api_url: required_var("EVOLUTION_API_URL")
                .trim_end_matches('/')
                .to_string(),
            evolution_api_instance: required_var("EVOLUTION_API_INSTANCE"),
            evolution_api_key: required_var("EVOLUTION_API_KEY"),
            notification_timeout_secs: parsed_var(
                "NOTIFICATION_TIMEOUT_SECS",
                defaults.notification_timeout_secs,
            ),
            notify_on_booking: parsed_var("NOTIFY_ON_BOOKING", defaults.notify_on_booking),
            cpf_uniqueness: parsed_var("CPF_UNIQUENESS", defaults.cpf_uniqueness),
            store_backend: parsed_var("STORE_BACKEND", defaults.store_backend),
            port: parsed_var("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_whatsapp_configured() {
            warn!("WhatsApp (Evolution API) not configured - outbound messages will fail");
        }

        config
    }

    /// Storage and authentication settings are present.
    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
            }
        };

        store_ready && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_whatsapp_configured(&self) -> bool {
        !self.evolution_api_url.is_empty()
            && !self.evolution_api_instance.is_empty()
            && !self.evolution_api_key.is_empty()
    }
}

fn required_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr + fmt::Debug,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{} has invalid value '{}' ({}), using default {:?}", name, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_scope_parses_known_values() {
        assert_eq!("global".parse::<CpfScope>().unwrap(), CpfScope::Global);
        assert_eq!("Clinic".parse::<CpfScope>().unwrap(), CpfScope::Clinic);
        assert!("everywhere".parse::<CpfScope>().is_err());
    }

    #[test]
    fn memory_backend_only_needs_jwt_secret() {
        let config = AppConfig {
            store_backend: StoreBackend::Memory,
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };

        assert!(config.is_configured());
        assert!(!config.is_whatsapp_configured());
    }

    #[test]
    fn supabase_backend_requires_url_and_key() {
        let config = AppConfig {
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };

        assert!(!config.is_configured());
    }
}
