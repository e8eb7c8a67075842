//! A single tracked interval.

use chrono::{DateTime, Duration, Offset, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;
use crate::types::{TaskName, ValidationError};

/// Attempted to stop an event that is not running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{task} is not running")]
pub struct NotRunningError {
    pub task: TaskName,
}

/// A stop that was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopError {
    #[error(transparent)]
    NotRunning(#[from] NotRunningError),

    /// The stop time is earlier than the event's start.
    #[error("{task} cannot stop at {}: it started at {}", timestamp(.stop), timestamp(.start))]
    BeforeStart {
        task: TaskName,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

fn timestamp(value: &DateTime<Utc>) -> String {
    codec::format_timestamp(*value)
}

/// One start/stop interval for a task.
///
/// A zero duration marks the event as running. Stopping sets the duration
/// once; only a forced stop (amend) may overwrite it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    task: TaskName,
    start: DateTime<Utc>,
    #[serde(with = "duration_seconds")]
    duration: Duration,
    #[serde(default)]
    message: String,
}

impl Event {
    /// Creates an event after validating every field.
    ///
    /// A supplied `start` may come from any time zone but must carry a zero
    /// UTC offset, so a timestamp that was never normalised is rejected
    /// rather than silently shifted. `None` starts the event now.
    pub fn new<Tz: TimeZone>(
        task: &str,
        start: Option<&DateTime<Tz>>,
        duration: Duration,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let task = TaskName::new(task)?;

        let start = match start {
            Some(start) => {
                let offset = start.offset().fix();
                if offset.local_minus_utc() != 0 {
                    return Err(ValidationError::NonUtcTimestamp {
                        offset: offset.to_string(),
                    });
                }
                start.with_timezone(&Utc)
            }
            None => codec::now(),
        };
        if duration < Duration::zero() {
            return Err(ValidationError::NegativeDuration {
                seconds: duration.num_seconds(),
            });
        }

        Ok(Self::from_parts(task, start, duration, message.into()))
    }

    /// Creates a running event for `task` starting at `start`.
    pub fn running(task: TaskName, start: DateTime<Utc>) -> Self {
        Self::from_parts(task, start, Duration::zero(), String::new())
    }

    /// Assembles an event from already-validated parts.
    ///
    /// Sub-second precision is dropped from both `start` and `duration`.
    pub fn from_parts(
        task: TaskName,
        start: DateTime<Utc>,
        duration: Duration,
        message: String,
    ) -> Self {
        Self {
            task,
            start: start.trunc_subsecs(0),
            duration: Duration::seconds(duration.num_seconds()),
            message,
        }
    }

    pub const fn task(&self) -> &TaskName {
        &self.task
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn duration(&self) -> Duration {
        self.duration
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the event ended. Equal to `start` while running.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Returns the task name if this event is running.
    pub fn is_running(&self) -> Option<&TaskName> {
        self.duration.is_zero().then_some(&self.task)
    }

    /// Stops the event now. See [`Event::stop_at`].
    pub fn stop(&mut self, message: Option<String>, force: bool) -> Result<(), StopError> {
        self.stop_at(message, force, codec::now())
    }

    /// Stops the event at `now`.
    ///
    /// Fails unless the event is running or `force` is set; a forced stop
    /// recomputes the duration of an already stopped event. A `now` earlier
    /// than the start is refused. Stopping within the start's second
    /// records one second, otherwise the event would still read as
    /// running. A `Some` message replaces the current one.
    pub fn stop_at(
        &mut self,
        message: Option<String>,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StopError> {
        if !force && self.is_running().is_none() {
            return Err(NotRunningError {
                task: self.task.clone(),
            }
            .into());
        }

        let now = now.trunc_subsecs(0);
        if now < self.start {
            return Err(StopError::BeforeStart {
                task: self.task.clone(),
                start: self.start,
                stop: now,
            });
        }

        let elapsed = (now - self.start).num_seconds().max(1);
        self.duration = Duration::seconds(elapsed);
        if let Some(message) = message {
            self.message = message;
        }
        Ok(())
    }
}

/// Serialises a [`Duration`] as whole seconds.
mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        if seconds < 0 {
            return Err(de::Error::custom(format!(
                "duration cannot be negative: {seconds}"
            )));
        }
        Duration::try_seconds(seconds)
            .ok_or_else(|| de::Error::custom(format!("duration out of range: {seconds}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn task(name: &str) -> TaskName {
        TaskName::new(name).unwrap()
    }

    #[test]
    fn new_validates_task_name() {
        let result = Event::new("a/b", Some(&at(9, 0)), Duration::zero(), "");
        assert!(matches!(result, Err(ValidationError::ContainsSlash { .. })));
    }

    #[test]
    fn new_rejects_non_utc_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = offset.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap();
        let result = Event::new("work", Some(&start), Duration::zero(), "");
        assert!(matches!(
            result,
            Err(ValidationError::NonUtcTimestamp { .. })
        ));
    }

    #[test]
    fn new_accepts_zero_fixed_offset() {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, 9, 0, 0)
            .unwrap();
        let event = Event::new("work", Some(&start), Duration::hours(1), "done").unwrap();
        assert_eq!(event.start(), at(9, 0));
        assert_eq!(event.end(), at(10, 0));
        assert_eq!(event.message(), "done");
    }

    #[test]
    fn new_without_start_begins_now() {
        let before = codec::now();
        let event = Event::new::<Utc>("work", None, Duration::zero(), "").unwrap();
        assert!(event.start() >= before);
        assert!(event.start() <= codec::now());
        assert_eq!(event.is_running(), Some(&task("work")));
    }

    #[test]
    fn new_rejects_negative_duration() {
        let result = Event::new("work", Some(&at(9, 0)), Duration::seconds(-5), "");
        assert_eq!(
            result,
            Err(ValidationError::NegativeDuration { seconds: -5 })
        );
    }

    #[test]
    fn zero_duration_means_running() {
        let running = Event::running(task("work"), at(9, 0));
        assert_eq!(running.is_running(), Some(&task("work")));

        let stopped = Event::from_parts(task("work"), at(9, 0), Duration::minutes(5), String::new());
        assert_eq!(stopped.is_running(), None);
    }

    #[test]
    fn stop_sets_duration_and_message() {
        let mut event = Event::running(task("work"), at(9, 0));
        event
            .stop_at(Some("wrote tests".to_string()), false, at(10, 30))
            .unwrap();
        assert_eq!(event.duration(), Duration::minutes(90));
        assert_eq!(event.message(), "wrote tests");
        assert!(event.is_running().is_none());
    }

    #[test]
    fn stop_without_message_keeps_existing() {
        let mut event = Event::from_parts(task("work"), at(9, 0), Duration::minutes(5), "old".into());
        event.stop_at(None, true, at(9, 45)).unwrap();
        assert_eq!(event.message(), "old");
    }

    #[test]
    fn stop_twice_fails_without_force() {
        let mut event = Event::running(task("work"), at(9, 0));
        event.stop_at(None, false, at(10, 0)).unwrap();

        let err = event.stop_at(None, false, at(11, 0)).unwrap_err();
        assert_eq!(
            err,
            StopError::NotRunning(NotRunningError { task: task("work") })
        );
        assert_eq!(err.to_string(), "work is not running");
        assert_eq!(event.duration(), Duration::hours(1));
    }

    #[test]
    fn stop_before_start_is_refused() {
        let mut event = Event::running(task("work"), at(10, 0));

        let err = event.stop_at(Some("late".into()), false, at(9, 0)).unwrap_err();
        assert_eq!(
            err,
            StopError::BeforeStart {
                task: task("work"),
                start: at(10, 0),
                stop: at(9, 0),
            }
        );
        assert_eq!(
            err.to_string(),
            "work cannot stop at 2024-03-04T09:00:00Z: it started at 2024-03-04T10:00:00Z"
        );
        assert!(event.is_running().is_some());
        assert_eq!(event.message(), "");

        // A forced stop is held to the same rule.
        let mut stopped = Event::from_parts(task("work"), at(10, 0), Duration::hours(1), String::new());
        assert!(matches!(
            stopped.stop_at(None, true, at(9, 59)),
            Err(StopError::BeforeStart { .. })
        ));
        assert_eq!(stopped.duration(), Duration::hours(1));
    }

    #[test]
    fn forced_stop_amends_stopped_event() {
        let mut event = Event::running(task("work"), at(9, 0));
        event.stop_at(Some("first".into()), false, at(10, 0)).unwrap();
        event.stop_at(Some("second".into()), true, at(11, 0)).unwrap();
        assert_eq!(event.duration(), Duration::hours(2));
        assert_eq!(event.message(), "second");
    }

    #[test]
    fn stop_in_same_second_is_not_running() {
        let mut event = Event::running(task("work"), at(9, 0));
        event.stop_at(None, false, at(9, 0)).unwrap();
        assert_eq!(event.duration(), Duration::seconds(1));
        assert!(event.is_running().is_none());
    }

    #[test]
    fn from_parts_drops_subseconds() {
        let start = at(9, 0) + Duration::milliseconds(750);
        let event = Event::from_parts(task("work"), start, Duration::milliseconds(2500), String::new());
        assert_eq!(event.start(), at(9, 0));
        assert_eq!(event.duration(), Duration::seconds(2));
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::from_parts(task("work"), at(9, 0), Duration::minutes(20), "x,y".into());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"duration\":1200"));
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn event_deserialization_rejects_bad_fields() {
        let bad_task = r#"{"task":".x","start":"2024-03-04T09:00:00Z","duration":0}"#;
        assert!(serde_json::from_str::<Event>(bad_task).is_err());

        let negative = r#"{"task":"x","start":"2024-03-04T09:00:00Z","duration":-1}"#;
        assert!(serde_json::from_str::<Event>(negative).is_err());
    }
}
