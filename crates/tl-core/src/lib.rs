//! Core domain logic for the tl time tracker.
//!
//! This crate contains the fundamental types shared by the store and the CLI:
//! - Codec: text encoding of timestamps and ISO 8601 durations
//! - Task names: validated names that double as file names
//! - Events: one start/stop interval for a task

pub mod codec;
pub mod event;
pub mod types;

pub use codec::{ParseError, format_duration, format_timestamp, parse_duration, parse_timestamp};
pub use event::{Event, NotRunningError, StopError};
pub use types::{MAX_TASK_NAME_LEN, TaskName, ValidationError};
