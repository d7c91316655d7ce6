use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub duration_minutes: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub weekday: u8, // 0 = Sunday, 1 = Monday, etc.
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_working_day: bool,
}

impl WeeklySchedule {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.weekday > 6 {
            return Err(CatalogError::Invalid(
                "weekday must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        if self.work_start >= self.work_end {
            return Err(CatalogError::Invalid(
                "work_start must be before work_end".to_string(),
            ));
        }

        match (self.break_start, self.break_end) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) => {
                if start >= end {
                    return Err(CatalogError::Invalid(
                        "break_start must be before break_end".to_string(),
                    ));
                }
                if start < self.work_start || end > self.work_end {
                    return Err(CatalogError::Invalid(
                        "break must fall within working hours".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Err(CatalogError::Invalid(
                "break_start and break_end must be set together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid schedule: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<shared_database::DbError> for CatalogError {
    fn from(err: shared_database::DbError) -> Self {
        match err {
            shared_database::DbError::NotFound(msg) => CatalogError::NotFound(msg),
            other => CatalogError::Database(other.to_string()),
        }
    }
}

impl From<CatalogError> for shared_models::AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => shared_models::AppError::NotFound(msg),
            CatalogError::Invalid(msg) => shared_models::AppError::Validation(msg),
            CatalogError::Database(msg) => shared_models::AppError::Store(msg),
        }
    }
}
