pub mod availability;
pub mod booking;
pub mod lifecycle;
pub mod reminders;
pub mod slots;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use reminders::ReminderService;
pub use slots::SlotAllocatorService;
