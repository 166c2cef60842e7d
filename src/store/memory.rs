//! A `Store` kept in plain vectors, with a log of every write and switches to
//! make individual writes fail.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use super::{Store, TaskFilter};
use crate::model::{Entry, EntryId, Link, Subtask, SubtaskId, Task, TaskId, User, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Entry,
    Links(usize),
    TaskCompletion(Vec<TaskId>),
    SubtaskCompletion(Vec<SubtaskId>),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
    pub subtasks: Vec<Subtask>,
    pub entries: Vec<Entry>,
    pub links: Vec<Link>,
    pub writes: Vec<Write>,
    pub fail_entries: bool,
    pub fail_links: bool,
    pub fail_reads: bool,
    /// fails `tasks` only, which leaves commits working but not reloads
    pub fail_task_lists: bool,
    next_id: i32,
}

impl MemoryStore {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn task(&self, id: TaskId) -> &Task {
        self.tasks.iter().find(|task| task.id == id).unwrap()
    }

    pub fn subtask(&self, id: SubtaskId) -> &Subtask {
        self.subtasks.iter().find(|sub| sub.id == id).unwrap()
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads {
            bail!("read failed");
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn upsert_user(&mut self, email: &str, now: DateTime<Utc>) -> Result<User> {
        if let Some(user) = self.users.iter().find(|user| user.email == email) {
            return Ok(user.clone());
        }
        let user = User {
            id: UserId(self.next_id()),
            email: email.into(),
            created_at: now,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn tasks(&mut self, owner: UserId, filter: TaskFilter) -> Result<Vec<Task>> {
        self.check_reads()?;
        if self.fail_task_lists {
            bail!("task list failed");
        }
        Ok(self
            .tasks
            .iter()
            .filter(|task| task.user_id == owner)
            .filter(|task| filter == TaskFilter::All || task.is_active())
            .cloned()
            .collect())
    }

    fn tasks_by_id(&mut self, owner: UserId, ids: &[TaskId]) -> Result<Vec<Task>> {
        self.check_reads()?;
        Ok(self
            .tasks
            .iter()
            .filter(|task| task.user_id == owner && ids.contains(&task.id))
            .cloned()
            .collect())
    }

    fn subtasks(&mut self, owner: UserId, task_ids: &[TaskId]) -> Result<Vec<Subtask>> {
        self.check_reads()?;
        Ok(self
            .subtasks
            .iter()
            .filter(|sub| sub.user_id == owner && task_ids.contains(&sub.task_id))
            .cloned()
            .collect())
    }

    fn subtasks_by_id(&mut self, owner: UserId, ids: &[SubtaskId]) -> Result<Vec<Subtask>> {
        self.check_reads()?;
        Ok(self
            .subtasks
            .iter()
            .filter(|sub| sub.user_id == owner && ids.contains(&sub.id))
            .cloned()
            .collect())
    }

    fn insert_task(&mut self, owner: UserId, title: &str, now: DateTime<Utc>) -> Result<Task> {
        let task = Task {
            id: TaskId(self.next_id()),
            user_id: owner,
            title: title.into(),
            created_at: now,
            completed_at: None,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn insert_subtask(
        &mut self,
        owner: UserId,
        task_id: TaskId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Subtask> {
        if !self
            .tasks
            .iter()
            .any(|task| task.id == task_id && task.user_id == owner)
        {
            bail!("No task found with id {task_id:?}");
        }
        let subtask = Subtask {
            id: SubtaskId(self.next_id()),
            user_id: owner,
            task_id,
            title: title.into(),
            created_at: now,
            completed_at: None,
        };
        self.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    fn rename_subtask(&mut self, owner: UserId, id: SubtaskId, title: &str) -> Result<Subtask> {
        match self
            .subtasks
            .iter_mut()
            .find(|sub| sub.id == id && sub.user_id == owner)
        {
            Some(subtask) => {
                subtask.title = title.into();
                Ok(subtask.clone())
            }
            None => bail!("No subtask found with id {id:?}"),
        }
    }

    fn set_task_completion(
        &mut self,
        owner: UserId,
        ids: &[TaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.writes.push(Write::TaskCompletion(ids.to_vec()));
        for task in &mut self.tasks {
            if task.user_id == owner && ids.contains(&task.id) {
                task.completed_at = completed_at;
            }
        }
        Ok(())
    }

    fn set_subtask_completion(
        &mut self,
        owner: UserId,
        ids: &[SubtaskId],
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.writes.push(Write::SubtaskCompletion(ids.to_vec()));
        for subtask in &mut self.subtasks {
            if subtask.user_id == owner && ids.contains(&subtask.id) {
                subtask.completed_at = completed_at;
            }
        }
        Ok(())
    }

    fn insert_entry(
        &mut self,
        owner: UserId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        note: &str,
    ) -> Result<Entry> {
        if self.fail_entries {
            bail!("insert failed");
        }
        self.writes.push(Write::Entry);
        let entry = Entry {
            id: EntryId(self.next_id()),
            user_id: owner,
            started_at,
            ended_at,
            note: note.into(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn insert_links(&mut self, links: &[Link]) -> Result<()> {
        if self.fail_links {
            bail!("insert failed");
        }
        self.writes.push(Write::Links(links.len()));
        self.links.extend_from_slice(links);
        Ok(())
    }

    fn entries(&mut self, owner: UserId, since: Option<DateTime<Utc>>) -> Result<Vec<Entry>> {
        self.check_reads()?;
        let mut entries: Vec<Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.user_id == owner)
            .filter(|entry| since.map_or(true, |since| entry.started_at >= since))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(entries)
    }

    fn links(&mut self, entry_ids: &[EntryId]) -> Result<Vec<Link>> {
        self.check_reads()?;
        Ok(self
            .links
            .iter()
            .filter(|link| entry_ids.contains(&link.entry_id))
            .copied()
            .collect())
    }

    fn completions(&mut self, owner: UserId, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        self.check_reads()?;
        let tasks = self
            .tasks
            .iter()
            .filter(|task| task.user_id == owner)
            .filter_map(|task| task.completed_at);
        let subtasks = self
            .subtasks
            .iter()
            .filter(|sub| sub.user_id == owner)
            .filter_map(|sub| sub.completed_at);
        Ok(tasks.chain(subtasks).filter(|at| *at >= since).collect())
    }
}
