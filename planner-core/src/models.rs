use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::dates::{parse_wall_clock, DateKey};
use crate::errors::SyncError;

/// Identity of a to-do item.
///
/// `Confirmed` ids were issued by the remote source and can be addressed
/// through it. `Pending` tokens are synthesized locally and are only unique
/// within one date's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    Confirmed(i64),
    Pending(u64),
}

impl TaskId {
    /// Maps the signed integers used on the wire: positive values are
    /// server ids, anything else is a placeholder.
    pub fn from_raw(raw: i64) -> Self {
        if raw > 0 {
            TaskId::Confirmed(raw)
        } else {
            TaskId::Pending(raw.unsigned_abs())
        }
    }

    pub fn remote_id(&self) -> Option<i64> {
        match self {
            TaskId::Confirmed(id) => Some(*id),
            TaskId::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TaskId::Pending(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Confirmed(id) => write!(f, "{id}"),
            TaskId::Pending(token) => write!(f, "pending-{token}"),
        }
    }
}

impl FromStr for TaskId {
    type Err = SyncError;

    /// Accepts the `Display` forms: `42` or `pending-7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || SyncError::InvalidInput(format!("not a task id: {s:?}"));
        match s.strip_prefix("pending-") {
            Some(token) => token.parse().map(TaskId::Pending).map_err(|_| invalid()),
            None => s.parse().map(TaskId::from_raw).map_err(|_| invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Builds a slot from two endpoint strings, each a bare time or a
    /// date-time. Both must parse.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(parse_wall_clock(start)?, parse_wall_clock(end)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: TaskId,
    pub title: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<TimeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskItem {
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            done: false,
            time_slot: None,
            completed_at: None,
        }
    }

    /// Sets `done`, keeping `completed_at` in step with the transition.
    pub fn set_done(&mut self, done: bool, now: DateTime<Utc>) {
        if done && !self.done {
            self.completed_at = Some(now);
        } else if !done {
            self.completed_at = None;
        }
        self.done = done;
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_done(self.done)
    }
}

/// Wire form of the completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Completed,
    NotCompleted,
}

impl TaskStatus {
    pub fn from_done(done: bool) -> Self {
        if done {
            TaskStatus::Completed
        } else {
            TaskStatus::NotCompleted
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// One user's lists, keyed by local date. Newest items come first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodosByDate(BTreeMap<DateKey, Vec<TaskItem>>);

impl TodosByDate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: &DateKey) -> &[TaskItem] {
        self.0.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The list for `date`, or an empty list when nothing is stored.
    pub fn items(&self, date: &DateKey) -> Vec<TaskItem> {
        self.get(date).to_vec()
    }

    pub fn set(&mut self, date: DateKey, items: Vec<TaskItem>) {
        self.0.insert(date, items);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    Mentee,
    Mentor,
}

/// The signed-in user as far as the to-do engine is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub role: UserRole,
}

impl UserSession {
    pub fn mentee(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Mentee,
        }
    }

    pub fn mentor(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Mentor,
        }
    }

    /// Only mentees with an id keep to-do lists.
    pub fn owns_todos(&self) -> bool {
        self.role == UserRole::Mentee && !self.user_id.trim().is_empty()
    }
}
