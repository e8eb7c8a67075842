//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tl_core::parse_timestamp;
use tl_store::EventStore;

use crate::cli::{Filter, Period};

/// Applies a task and period filter to `store`, relative to `today`.
pub fn select(store: &EventStore, filter: &Filter, today: NaiveDate) -> EventStore {
    let store = match &filter.task {
        Some(task) => store.for_task(task),
        None => store.clone(),
    };

    match filter.period {
        Period::Day => store.for_date(today.year(), Some(today.month()), Some(today.day())),
        Period::Week => {
            let week = today.iso_week();
            store.for_week(week.year(), week.week())
        }
        Period::Month => store.for_date(today.year(), Some(today.month()), None),
        Period::Year => store.for_date(today.year(), None, None),
        Period::All => store,
    }
}

/// Parses an optional `--at` argument.
pub fn parse_at(at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    at.map(|text| {
        parse_timestamp(text).with_context(|| {
            format!("invalid --at {text:?}, expected ISO 8601 (e.g., 2024-01-15T09:00:00Z)")
        })
    })
    .transpose()
}

/// Formats a duration as "Xh MMm" if >= 1 hour, "Xm" otherwise.
pub fn format_hours(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tl_core::{Event, TaskName};

    use super::*;

    fn event(name: &str, y: i32, m: u32, d: u32) -> Event {
        Event::from_parts(
            TaskName::new(name).unwrap(),
            Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap(),
            Duration::hours(1),
            String::new(),
        )
    }

    fn store() -> EventStore {
        EventStore::from_events(vec![
            event("a", 2023, 6, 1),
            event("a", 2024, 1, 2),
            event("b", 2024, 2, 26),
            event("a", 2024, 2, 28),
            event("b", 2024, 3, 1),
            event("a", 2024, 3, 4),
        ])
    }

    fn filter(task: Option<&str>, period: Period) -> Filter {
        Filter {
            task: task.map(str::to_string),
            period,
        }
    }

    #[test]
    fn select_by_period() {
        let store = store();
        // Friday of ISO week 9.
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(select(&store, &filter(None, Period::All), today).len(), 6);
        assert_eq!(select(&store, &filter(None, Period::Year), today).len(), 5);
        assert_eq!(select(&store, &filter(None, Period::Month), today).len(), 2);
        assert_eq!(select(&store, &filter(None, Period::Week), today).len(), 3);
        assert_eq!(select(&store, &filter(None, Period::Day), today).len(), 1);
    }

    #[test]
    fn select_by_task_and_period() {
        let store = store();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(select(&store, &filter(Some("a"), Period::All), today).len(), 4);
        assert_eq!(select(&store, &filter(Some("a"), Period::Week), today).len(), 1);
        assert!(select(&store, &filter(Some("zzz"), Period::All), today).is_empty());
    }

    #[test]
    fn parse_at_accepts_iso_and_none() {
        assert_eq!(parse_at(None).unwrap(), None);
        assert_eq!(
            parse_at(Some("2024-01-15T09:00:00Z")).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())
        );
        let err = parse_at(Some("tomorrow")).unwrap_err();
        assert!(err.to_string().contains("invalid --at"));
    }

    #[test]
    fn format_hours_values() {
        assert_eq!(format_hours(Duration::zero()), "0m");
        assert_eq!(format_hours(Duration::minutes(59)), "59m");
        assert_eq!(format_hours(Duration::minutes(60)), "1h 00m");
        assert_eq!(format_hours(Duration::minutes(125)), "2h 05m");
        assert_eq!(format_hours(Duration::hours(30)), "30h 00m");
    }
}
