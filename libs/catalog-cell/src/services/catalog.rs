use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{CatalogError, Provider, Service, WeeklySchedule};

/// Read side of the catalog: providers, the services they offer and
/// their weekly working hours.
pub struct CatalogService {
    supabase: PostgrestClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: PostgrestClient::new(config),
        }
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/providers?is_active=eq.true&order=full_name.asc",
                None,
            )
            .await?;

        let providers = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Provider>, _>>()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(providers)
    }

    pub async fn get_provider(&self, provider_id: Uuid) -> Result<Provider, CatalogError> {
        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("provider {}", provider_id)))?;

        serde_json::from_value(row).map_err(|e| CatalogError::Database(e.to_string()))
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, CatalogError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/services?order=category.asc,name.asc",
                None,
            )
            .await?;

        let services = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Service>, _>>()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(services)
    }

    /// Services grouped by category, categories in alphabetical order.
    pub async fn services_by_category(
        &self,
    ) -> Result<BTreeMap<String, Vec<Service>>, CatalogError> {
        let services = self.list_services().await?;

        let mut grouped: BTreeMap<String, Vec<Service>> = BTreeMap::new();
        for service in services {
            grouped.entry(service.category.clone()).or_default().push(service);
        }

        Ok(grouped)
    }

    pub async fn get_service(&self, service_id: Uuid) -> Result<Service, CatalogError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("service {}", service_id)))?;

        serde_json::from_value(row).map_err(|e| CatalogError::Database(e.to_string()))
    }

    pub async fn schedules_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<WeeklySchedule>, CatalogError> {
        debug!("Fetching schedules for provider {}", provider_id);

        let path = format!(
            "/rest/v1/provider_schedules?provider_id=eq.{}&order=weekday.asc",
            provider_id
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        let schedules = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WeeklySchedule>, _>>()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(schedules)
    }

    /// Schedule row for one weekday, `None` when the provider has no row
    /// for that day.
    pub async fn schedule_for_weekday(
        &self,
        provider_id: Uuid,
        weekday: u8,
    ) -> Result<Option<WeeklySchedule>, CatalogError> {
        let path = format!(
            "/rest/v1/provider_schedules?provider_id=eq.{}&weekday=eq.{}",
            provider_id, weekday
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        match result.into_iter().next() {
            Some(row) => {
                let schedule: WeeklySchedule = serde_json::from_value(row)
                    .map_err(|e| CatalogError::Database(e.to_string()))?;
                Ok(Some(schedule))
            }
            None => Ok(None),
        }
    }
}
