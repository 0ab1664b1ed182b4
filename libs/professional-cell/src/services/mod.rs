pub mod professional;

pub use professional::{validate_working_days, ProfessionalService};
