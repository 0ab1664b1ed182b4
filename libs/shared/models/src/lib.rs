pub mod auth;
pub mod error;
pub mod notification;
pub mod scheduling;
pub mod time_format;

pub use scheduling::*;
