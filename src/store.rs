// SPDX-License-Identifier: MPL-2.0

//! The persistence boundary.
//!
//! Everything above this module talks to a [`Store`], which filters rows by
//! owner, returns created rows from inserts and updates rows by id-set.  The
//! only implementation outside of tests is [`SqliteStore`].

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{Entry, EntryId, Link, Subtask, SubtaskId, Task, TaskId, User, UserId};

mod db;
#[cfg(test)]
pub mod memory;
mod schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    /// only tasks without a completion timestamp
    Active,
}

pub trait Store {
    /// Finds the user with this email, creating them on first sign-in.
    fn upsert_user(&mut self, email: &str, now: DateTime<Utc>) -> Result<User>;

    /// Tasks owned by the user, oldest first.
    fn tasks(&mut self, owner: UserId, filter: TaskFilter) -> Result<Vec<Task>>;
    fn tasks_by_id(&mut self, owner: UserId, ids: &[TaskId]) -> Result<Vec<Task>>;
    /// Subtasks of the given tasks, oldest first.
    fn subtasks(&mut self, owner: UserId, task_ids: &[TaskId]) -> Result<Vec<Subtask>>;
    fn subtasks_by_id(&mut self, owner: UserId, ids: &[SubtaskId]) -> Result<Vec<Subtask>>;

    fn insert_task(&mut self, owner: UserId, title: &str, now: DateTime<Utc>) -> Result<Task>;
    /// Fails if the parent task doesn't belong to `owner`.
    fn insert_subtask(
        &mut self,
        owner: UserId,
        task_id: TaskId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Subtask>;
    fn rename_subtask(&mut self, owner: UserId, id: SubtaskId, title: &str) -> Result<Subtask>;

    fn set_task_completion(
        &mut self,
        owner: UserId,
        ids: &[TaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
    fn set_subtask_completion(
        &mut self,
        owner: UserId,
        ids: &[SubtaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    fn insert_entry(
        &mut self,
        owner: UserId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        note: &str,
    ) -> Result<Entry>;
    fn insert_links(&mut self, links: &[Link]) -> Result<()>;

    /// Entries started at or after `since`, newest first.
    fn entries(&mut self, owner: UserId, since: Option<DateTime<Utc>>) -> Result<Vec<Entry>>;
    fn links(&mut self, entry_ids: &[EntryId]) -> Result<Vec<Link>>;

    /// Every task and subtask completion timestamp at or after `since`.
    fn completions(&mut self, owner: UserId, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>>;
}

pub struct SqliteStore {
    conn: db::Conn,
}

impl SqliteStore {
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: db::establish_connection(database_path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: db::establish_in_memory()?,
        })
    }
}

impl Store for SqliteStore {
    fn upsert_user(&mut self, email: &str, now: DateTime<Utc>) -> Result<User> {
        let row = db::upsert_user(&mut self.conn, email, now)?;
        Ok(User {
            id: UserId(row.id),
            email: row.email,
            created_at: row.created_at,
        })
    }

    fn tasks(&mut self, owner: UserId, filter: TaskFilter) -> Result<Vec<Task>> {
        let rows = db::query_tasks(&mut self.conn, owner.0, filter == TaskFilter::Active)?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    fn tasks_by_id(&mut self, owner: UserId, ids: &[TaskId]) -> Result<Vec<Task>> {
        let ids: Vec<i32> = ids.iter().map(|id| id.0).collect();
        let rows = db::query_tasks_by_id(&mut self.conn, owner.0, &ids)?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    fn subtasks(&mut self, owner: UserId, task_ids: &[TaskId]) -> Result<Vec<Subtask>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = task_ids.iter().map(|id| id.0).collect();
        let rows = db::query_subtasks(&mut self.conn, owner.0, &ids)?;
        Ok(rows.into_iter().map(Subtask::from).collect())
    }

    fn subtasks_by_id(&mut self, owner: UserId, ids: &[SubtaskId]) -> Result<Vec<Subtask>> {
        let ids: Vec<i32> = ids.iter().map(|id| id.0).collect();
        let rows = db::query_subtasks_by_id(&mut self.conn, owner.0, &ids)?;
        Ok(rows.into_iter().map(Subtask::from).collect())
    }

    fn insert_task(&mut self, owner: UserId, title: &str, now: DateTime<Utc>) -> Result<Task> {
        Ok(db::insert_task(&mut self.conn, owner.0, title, now)?.into())
    }

    fn insert_subtask(
        &mut self,
        owner: UserId,
        task_id: TaskId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Subtask> {
        Ok(db::insert_subtask(&mut self.conn, owner.0, task_id.0, title, now)?.into())
    }

    fn rename_subtask(&mut self, owner: UserId, id: SubtaskId, title: &str) -> Result<Subtask> {
        Ok(db::update_subtask_title(&mut self.conn, owner.0, id.0, title)?.into())
    }

    fn set_task_completion(
        &mut self,
        owner: UserId,
        ids: &[TaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let ids: Vec<i32> = ids.iter().map(|id| id.0).collect();
        let count = db::set_task_completed_at(&mut self.conn, owner.0, &ids, completed_at)?;
        log::trace!("Set completion of {count} task(s) to {completed_at:?}");
        Ok(())
    }

    fn set_subtask_completion(
        &mut self,
        owner: UserId,
        ids: &[SubtaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let ids: Vec<i32> = ids.iter().map(|id| id.0).collect();
        let count = db::set_subtask_completed_at(&mut self.conn, owner.0, &ids, completed_at)?;
        log::trace!("Set completion of {count} subtask(s) to {completed_at:?}");
        Ok(())
    }

    fn insert_entry(
        &mut self,
        owner: UserId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        note: &str,
    ) -> Result<Entry> {
        Ok(db::insert_entry(&mut self.conn, owner.0, started_at, ended_at, note)?.into())
    }

    fn insert_links(&mut self, links: &[Link]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        let rows: Vec<db::NewLink> = links
            .iter()
            .map(|link| db::NewLink {
                entry_id: link.entry_id.0,
                task_id: link.task_id.0,
                subtask_id: link.subtask_id.map(|id| id.0),
            })
            .collect();
        db::insert_links(&mut self.conn, &rows)?;
        Ok(())
    }

    fn entries(&mut self, owner: UserId, since: Option<DateTime<Utc>>) -> Result<Vec<Entry>> {
        let rows = db::query_entries(&mut self.conn, owner.0, since)?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    fn links(&mut self, entry_ids: &[EntryId]) -> Result<Vec<Link>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = entry_ids.iter().map(|id| id.0).collect();
        let rows = db::query_links(&mut self.conn, &ids)?;
        Ok(rows
            .into_iter()
            .map(|row| Link {
                entry_id: EntryId(row.entry_id),
                task_id: TaskId(row.task_id),
                subtask_id: row.subtask_id.map(SubtaskId),
            })
            .collect())
    }

    fn completions(&mut self, owner: UserId, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        db::query_completions(&mut self.conn, owner.0, since)
    }
}

impl From<db::TaskRow> for Task {
    fn from(row: db::TaskRow) -> Self {
        Task {
            id: TaskId(row.id),
            user_id: UserId(row.user_id),
            title: row.title,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

impl From<db::SubtaskRow> for Subtask {
    fn from(row: db::SubtaskRow) -> Self {
        Subtask {
            id: SubtaskId(row.id),
            user_id: UserId(row.user_id),
            task_id: TaskId(row.task_id),
            title: row.title,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

impl From<db::EntryRow> for Entry {
    fn from(row: db::EntryRow) -> Self {
        Entry {
            id: EntryId(row.id),
            user_id: UserId(row.user_id),
            started_at: row.started_at,
            ended_at: row.ended_at,
            note: row.note,
        }
    }
}
