pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Booking, BookingError, BookingStatus, ReserveRequest};
pub use services::availability::AvailabilityService;
pub use services::ledger::BookingLedgerService;
pub use services::notifier::{LogNotifier, Notifier};
pub use services::sweeper::ExpirySweeper;
