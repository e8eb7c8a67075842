//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest task name accepted, in bytes.
///
/// Task names become file names, so this follows the common `NAME_MAX`.
pub const MAX_TASK_NAME_LEN: usize = 255;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Task names must not start with a dot.
    #[error("task name cannot start with '.': {name}")]
    LeadingDot { name: String },

    /// Task names must not contain a path separator.
    #[error("task name cannot contain '/': {name}")]
    ContainsSlash { name: String },

    /// Task names must not contain NUL bytes.
    #[error("task name cannot contain NUL bytes")]
    ContainsNul,

    /// Task name longer than [`MAX_TASK_NAME_LEN`] bytes.
    #[error("task name is {len} bytes long, the limit is {MAX_TASK_NAME_LEN}")]
    TooLong { len: usize },

    /// Durations cannot be negative.
    #[error("duration cannot be negative: {seconds}s")]
    NegativeDuration { seconds: i64 },

    /// A timestamp carried an offset other than UTC.
    #[error("timestamp must be in UTC, got offset {offset}")]
    NonUtcTimestamp { offset: String },
}

/// A validated task name.
///
/// Every task maps to one data file named after it, so names are restricted
/// to what is safe as a single path component: non-empty, no leading `.`,
/// no `/`, no NUL, at most [`MAX_TASK_NAME_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    /// Creates a new task name after validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "task name" });
        }
        if name.starts_with('.') {
            return Err(ValidationError::LeadingDot { name });
        }
        if name.contains('/') {
            return Err(ValidationError::ContainsSlash { name });
        }
        if name.contains('\0') {
            return Err(ValidationError::ContainsNul);
        }
        if name.len() > MAX_TASK_NAME_LEN {
            return Err(ValidationError::TooLong { len: name.len() });
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TaskName {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskName> for String {
    fn from(name: TaskName) -> Self {
        name.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TaskName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
