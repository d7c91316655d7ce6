pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CatalogError, Provider, Service, WeeklySchedule};
pub use services::catalog::CatalogService;
