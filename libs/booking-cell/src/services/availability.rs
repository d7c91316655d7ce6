use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use catalog_cell::models::{CatalogError, WeeklySchedule};
use catalog_cell::services::catalog::CatalogService;
use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::BookingError;

pub const SLOT_GRANULARITY_MINUTES: i32 = 30;

/// A stretch of the day already claimed by an active booking.
#[derive(Debug, Clone, Deserialize)]
pub struct OccupiedInterval {
    pub time: NaiveTime,
    pub duration_minutes: i32,
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

fn minutes_from_midnight(time: NaiveTime) -> i32 {
    (time.num_seconds_from_midnight() / 60) as i32
}

/// Candidate start times on the half-hour grid that fit entirely inside
/// working hours and overlap neither the break nor any occupied interval.
pub fn compute_free_slots(
    schedule: &WeeklySchedule,
    duration_minutes: i32,
    occupied: &[OccupiedInterval],
) -> Vec<NaiveTime> {
    if !schedule.is_working_day || duration_minutes <= 0 {
        return vec![];
    }

    let work_start = minutes_from_midnight(schedule.work_start);
    let work_end = minutes_from_midnight(schedule.work_end);

    let mut blocked: Vec<(i32, i32)> = occupied
        .iter()
        .map(|o| {
            let start = minutes_from_midnight(o.time);
            (start, start + o.duration_minutes)
        })
        .collect();

    if let (Some(break_start), Some(break_end)) = (schedule.break_start, schedule.break_end) {
        blocked.push((
            minutes_from_midnight(break_start),
            minutes_from_midnight(break_end),
        ));
    }

    let mut slots = Vec::new();
    let mut candidate = work_start;
    while candidate + duration_minutes <= work_end {
        let candidate_end = candidate + duration_minutes;
        let clashes = blocked
            .iter()
            .any(|&(start, end)| candidate < end && candidate_end > start);

        if !clashes {
            if let Some(time) =
                NaiveTime::from_num_seconds_from_midnight_opt(candidate as u32 * 60, 0)
            {
                slots.push(time);
            }
        }

        candidate += SLOT_GRANULARITY_MINUTES;
    }

    slots
}

pub struct AvailabilityService {
    supabase: PostgrestClient,
    catalog: CatalogService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: PostgrestClient::new(config),
            catalog: CatalogService::new(config),
        }
    }

    /// Free start times for a provider on one date, for a booking of the
    /// given length. A day without a schedule row is simply fully booked
    /// from the caller's point of view.
    pub async fn free_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Result<Vec<NaiveTime>, BookingError> {
        if duration_minutes <= 0 {
            return Err(BookingError::Validation(
                "duration must be positive".to_string(),
            ));
        }

        self.catalog.get_provider(provider_id).await.map_err(|e| match e {
            CatalogError::NotFound(_) => BookingError::ProviderNotFound(provider_id),
            other => BookingError::Store(other.to_string()),
        })?;

        let schedule = match self
            .catalog
            .schedule_for_weekday(provider_id, weekday_index(date))
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
        {
            Some(schedule) if schedule.is_working_day => schedule,
            _ => {
                debug!("Provider {} not working on {}", provider_id, date);
                return Ok(vec![]);
            }
        };

        let occupied = self.occupied_intervals(provider_id, date).await?;
        Ok(compute_free_slots(&schedule, duration_minutes, &occupied))
    }

    async fn occupied_intervals(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<OccupiedInterval>, BookingError> {
        let path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&date=eq.{}&status=in.(pending_confirmation,confirmed)&select=time,duration_minutes",
            provider_id, date
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| BookingError::Store(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn workday() -> WeeklySchedule {
        WeeklySchedule {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            weekday: 2,
            work_start: t("09:00"),
            work_end: t("18:00"),
            break_start: None,
            break_end: None,
            is_working_day: true,
        }
    }

    #[test]
    fn full_day_without_bookings() {
        let slots = compute_free_slots(&workday(), 30, &[]);

        assert_eq!(slots.first(), Some(&t("09:00")));
        assert_eq!(slots.last(), Some(&t("17:30")));
        assert_eq!(slots.len(), 18);
    }

    #[test]
    fn occupied_interval_blocks_overlapping_starts() {
        let occupied = [OccupiedInterval {
            time: t("10:00"),
            duration_minutes: 60,
        }];
        let slots = compute_free_slots(&workday(), 30, &occupied);

        assert!(slots.contains(&t("09:30")));
        assert!(!slots.contains(&t("10:00")));
        assert!(!slots.contains(&t("10:30")));
        assert!(slots.contains(&t("11:00")));
    }

    #[test]
    fn long_booking_cannot_start_right_before_occupied() {
        let occupied = [OccupiedInterval {
            time: t("10:00"),
            duration_minutes: 30,
        }];
        let slots = compute_free_slots(&workday(), 60, &occupied);

        // a 60-minute visit at 09:30 would run into the 10:00 booking
        assert!(!slots.contains(&t("09:30")));
        assert!(slots.contains(&t("09:00")));
        assert!(slots.contains(&t("10:30")));
    }

    #[test]
    fn slot_must_end_within_working_hours() {
        let slots = compute_free_slots(&workday(), 45, &[]);

        // 17:30 + 45min spills past 18:00
        assert!(!slots.contains(&t("17:30")));
        assert_eq!(slots.last(), Some(&t("17:00")));
    }

    #[test]
    fn break_window_is_blocked() {
        let mut schedule = workday();
        schedule.break_start = Some(t("13:00"));
        schedule.break_end = Some(t("14:00"));

        let slots = compute_free_slots(&schedule, 30, &[]);

        assert!(slots.contains(&t("12:30")));
        assert!(!slots.contains(&t("13:00")));
        assert!(!slots.contains(&t("13:30")));
        assert!(slots.contains(&t("14:00")));
    }

    #[test]
    fn non_working_day_has_no_slots() {
        let mut schedule = workday();
        schedule.is_working_day = false;

        assert!(compute_free_slots(&schedule, 30, &[]).is_empty());
    }

    #[test]
    fn every_slot_fits_between_bounds() {
        let occupied = [
            OccupiedInterval {
                time: t("09:30"),
                duration_minutes: 45,
            },
            OccupiedInterval {
                time: t("15:00"),
                duration_minutes: 90,
            },
        ];
        let duration = 45;
        let slots = compute_free_slots(&workday(), duration, &occupied);

        for slot in &slots {
            assert!(*slot >= t("09:00"));
            let end = minutes_from_midnight(*slot) + duration;
            assert!(end <= minutes_from_midnight(t("18:00")));
        }
    }
}
