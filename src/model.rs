// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubtaskId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub i32);

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    pub id: SubtaskId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Subtask {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A single focus session, as saved once the timer has been stopped and
/// committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub note: String,
}

impl Entry {
    /// Whole seconds between start and end, rounded to the nearest second.
    pub fn duration_seconds(&self) -> i64 {
        rounded_seconds(self.started_at, self.ended_at)
    }
}

/// Records that an entry completed a task, or one subtask of that task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Link {
    pub entry_id: EntryId,
    pub task_id: TaskId,
    pub subtask_id: Option<SubtaskId>,
}

pub fn rounded_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    // round half away from zero, same as rounding the millisecond count / 1000
    (millis as f64 / 1000.0).round() as i64
}
