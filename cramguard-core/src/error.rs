//! Error types for cramguard-core.
//!
//! Every variant is recoverable and carries a message fit to show the user.

use thiserror::Error;

/// Reasons free-text intake can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Please enter a task description")]
    EmptyInput,

    #[error("Task description is too short")]
    InputTooShort,

    /// Nothing usable was left once date, priority and connector words were removed.
    #[error("Could not extract a task title. Try: \"{example}\"")]
    TitleExtractionFailed { example: String },
}

/// Errors from block suggestion and swapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("block count must be at least 1")]
    ZeroCount,

    #[error("block count {count} is above the limit of {max}")]
    CountTooLarge { count: usize, max: usize },

    #[error("a due date is required before blocks can be suggested")]
    MissingDueDate,
}

/// Errors from the in-memory planner board.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("no task with id '{0}'")]
    UnknownTask(String),

    #[error("no block with id '{0}'")]
    UnknownBlock(String),

    #[error("task '{0}' already exists")]
    DuplicateTask(String),

    #[error("block '{0}' is committed; uncommit it before swapping")]
    BlockCommitted(String),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Errors from calendar export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("No committed blocks to export")]
    NoBlocks,

    #[error("No valid events to export (blocks reference unknown tasks)")]
    NoValidEvents,
}

/// A configuration table that would break a hard scheduling constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid rules value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl RulesError {
    pub fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid local datetime '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },
}
