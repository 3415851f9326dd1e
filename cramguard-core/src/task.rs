//! Task and block model shared by the intake parser, the suggestion engine
//! and the planner board.
//!
//! All times are local wall-clock values (`NaiveDateTime`). Converting from a
//! real clock into the user's timezone is the caller's job (see `time`).

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::time::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}' (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    School,
    Work,
    Personal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "school",
            Self::Work => "work",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "school" => Ok(Self::School),
            "work" => Ok(Self::Work),
            "personal" => Ok(Self::Personal),
            other => Err(format!(
                "unknown category '{other}' (expected school, work or personal)"
            )),
        }
    }
}

/// A unit of work the user wants to finish before `due`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Local wall-clock deadline.
    pub due: NaiveDateTime,

    pub priority: Priority,
    pub category: Category,

    /// Estimated hours of work.
    pub effort: u32,

    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, due: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            due,
            priority: Priority::Medium,
            category: Category::School,
            effort: 4,
            created_at: due,
            completed_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_effort(mut self, hours: u32) -> Self {
        self.effort = hours;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the invariants the suggestion engine relies on.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.id.trim().is_empty() {
            return Err(PlanError::InvalidTask("task id is empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(PlanError::InvalidTask(format!("task {} has an empty title", self.id)));
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whole hours left until the deadline (floored, negative when overdue).
    pub fn hours_until_due(&self, now: NaiveDateTime) -> i64 {
        (self.due - now).num_minutes().div_euclid(60)
    }
}

/// Structured fields recovered from free text, before the user confirms them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub due: Option<NaiveDateTime>,
    pub priority: Priority,
    pub category: Category,
    pub effort: u32,
    pub original_input: String,
    /// The span the temporal resolver recognized, if any.
    pub date_text: Option<String>,
}

impl TaskDraft {
    pub fn with_due(mut self, due: NaiveDateTime) -> Self {
        self.due = Some(due);
        self
    }

    /// Explicit days like "today 9am" are kept as written, so a draft can land
    /// at or before `now`.
    pub fn is_past_due(&self, now: NaiveDateTime) -> bool {
        self.due.is_some_and(|due| due <= now)
    }

    /// Promote the draft to a task. Fails while no due date is known.
    pub fn into_task(self, id: impl Into<String>, now: NaiveDateTime) -> Result<Task, PlanError> {
        let due = self.due.ok_or(PlanError::MissingDueDate)?;
        let task = Task {
            id: id.into(),
            title: self.title,
            description: None,
            due,
            priority: self.priority,
            category: self.category,
            effort: self.effort,
            created_at: now,
            completed_at: None,
        };
        task.validate()?;
        Ok(task)
    }
}

/// A proposed or committed work window for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub task_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Minutes.
    pub duration: u32,
    pub reason: String,
}

impl Block {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at() + chrono::Duration::minutes(i64::from(self.duration))
    }

    /// Conflict key used by swaps.
    pub fn slot(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.start_time)
    }

    /// Rounded hours between this block's start and the task deadline, never negative.
    pub fn hours_ahead_of(&self, task: &Task) -> i64 {
        let minutes = (task.due - self.starts_at()).num_minutes();
        let hours = (minutes as f64 / 60.0).round() as i64;
        hours.max(0)
    }
}
