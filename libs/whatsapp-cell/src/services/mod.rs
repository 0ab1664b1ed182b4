pub mod confirmation;
pub mod dispatch;
pub mod evolution;
pub mod messages;
pub mod phone;

pub use confirmation::{transition, ConfirmationService, Transition};
pub use messages::MessageContext;
