pub mod extractor;
pub mod jwt;
pub mod state;
pub mod test_utils;

pub use extractor::{auth_middleware, require_clinic};
pub use state::AppState;
