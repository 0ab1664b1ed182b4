pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::whatsapp_routes;
pub use services::dispatch::{dispatcher_from_config, send_with_timeout};
pub use services::evolution::EvolutionApiClient;
