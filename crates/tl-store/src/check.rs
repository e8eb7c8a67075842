//! Consistency scan over a store.

use std::fmt;

use chrono::{DateTime, Utc};
use tl_core::{Event, codec, format_duration, format_timestamp};

use crate::EventStore;

/// A problem found by [`EventStore::consistency_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency<'a> {
    /// `previous` is still going when `current` starts.
    Overlap {
        previous: &'a Event,
        current: &'a Event,
    },
    /// The event starts after the time of the check.
    FutureStart(&'a Event),
    /// The stopped event ends after the time of the check.
    FutureEnd(&'a Event),
}

impl fmt::Display for Inconsistency<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap { previous, current } => {
                let length = if previous.is_running().is_some() {
                    "running".to_string()
                } else {
                    format_duration(previous.duration())
                };
                write!(
                    f,
                    "overlap: {} {} {length} runs into {} {}",
                    previous.task(),
                    format_timestamp(previous.start()),
                    current.task(),
                    format_timestamp(current.start()),
                )
            }
            Self::FutureStart(event) => write!(
                f,
                "future start: {} {}",
                event.task(),
                format_timestamp(event.start())
            ),
            Self::FutureEnd(event) => write!(
                f,
                "future end: {} {} ends {}",
                event.task(),
                format_timestamp(event.start()),
                format_timestamp(event.end())
            ),
        }
    }
}

impl EventStore {
    /// Scans the store against the current time. See
    /// [`EventStore::consistency_check_at`].
    pub fn consistency_check(&self) -> Vec<Inconsistency<'_>> {
        self.consistency_check_at(codec::now())
    }

    /// Lists overlapping neighbours and events reaching past `now`.
    ///
    /// A running event counts as lasting until `now`, so an event started
    /// after it and before `now` overlaps it. This is stricter than comparing
    /// `start + duration` against the next start, which never flags a running
    /// event because its recorded duration is zero.
    pub fn consistency_check_at(&self, now: DateTime<Utc>) -> Vec<Inconsistency<'_>> {
        let mut found = Vec::new();
        let mut previous: Option<&Event> = None;

        for event in self {
            if let Some(prev) = previous {
                let prev_end = if prev.is_running().is_some() {
                    now.max(prev.start())
                } else {
                    prev.end()
                };
                if prev_end > event.start() {
                    found.push(Inconsistency::Overlap {
                        previous: prev,
                        current: event,
                    });
                }
            }

            if event.start() > now {
                found.push(Inconsistency::FutureStart(event));
            } else if event.is_running().is_none() && event.end() > now {
                found.push(Inconsistency::FutureEnd(event));
            }

            previous = Some(event);
        }

        if !found.is_empty() {
            tracing::debug!(count = found.len(), "consistency check found problems");
        }
        found
    }
}
