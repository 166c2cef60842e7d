// SPDX-License-Identifier: MPL-2.0

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::model::{Subtask, SubtaskId, Task, TaskId, UserId};
use crate::reconcile::{allows_direct_completion, derived_completion, Reconciler};
use crate::store::{Store, TaskFilter};

/// A task together with all of its subtasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub task: Task,
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardView {
    pub active: Vec<TaskCard>,
    /// most recently completed first
    pub inactive: Vec<TaskCard>,
}

/// Task and subtask management for one user.
pub struct Board<'a, S: Store> {
    store: &'a mut S,
    owner: UserId,
}

impl<'a, S: Store> Board<'a, S> {
    pub fn new(store: &'a mut S, owner: UserId) -> Self {
        Self { store, owner }
    }

    pub fn load(&mut self) -> Result<BoardView> {
        let tasks = self.store.tasks(self.owner, TaskFilter::All)?;
        let ids: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
        let mut subtasks = self.store.subtasks(self.owner, &ids)?;

        let mut view = BoardView::default();
        for task in tasks {
            let (mine, rest): (Vec<Subtask>, Vec<Subtask>) = subtasks
                .into_iter()
                .partition(|sub| sub.task_id == task.id);
            subtasks = rest;
            let card = TaskCard {
                task,
                subtasks: mine,
            };
            if card.task.is_active() {
                view.active.push(card);
            } else {
                view.inactive.push(card);
            }
        }
        view.inactive
            .sort_by(|a, b| b.task.completed_at.cmp(&a.task.completed_at));
        Ok(view)
    }

    pub fn add_task(&mut self, title: &str, now: DateTime<Utc>) -> Result<Task> {
        let title = non_empty_title(title)?;
        let task = self.store.insert_task(self.owner, title, now)?;
        log::info!("Added task {title}");
        Ok(task)
    }

    pub fn add_subtask(
        &mut self,
        task_id: TaskId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Subtask> {
        let title = non_empty_title(title)?;
        let task = self.task(task_id)?;
        if !task.is_active() {
            bail!(
                "Task {} is already complete, reopen it before adding subtasks",
                task.title
            );
        }
        let subtask = self.store.insert_subtask(self.owner, task_id, title, now)?;
        // a new open subtask may change whether the parent counts as complete
        sync_task_completion(&mut *self.store, self.owner, task_id)?;
        log::info!("Added subtask {title} to {}", task.title);
        Ok(subtask)
    }

    pub fn rename_subtask(&mut self, subtask_id: SubtaskId, title: &str) -> Result<Subtask> {
        let title = non_empty_title(title)?;
        self.store.rename_subtask(self.owner, subtask_id, title)
    }

    /// Flips a subtask between complete and open, then re-derives its parent.
    pub fn toggle_subtask_done(
        &mut self,
        subtask_id: SubtaskId,
        now: DateTime<Utc>,
    ) -> Result<Subtask> {
        let Some(mut subtask) = self
            .store
            .subtasks_by_id(self.owner, &[subtask_id])?
            .into_iter()
            .next()
        else {
            bail!("No subtask found with id {subtask_id:?}");
        };

        let next = match subtask.completed_at {
            Some(_) => None,
            None => Some(now),
        };
        self.store
            .set_subtask_completion(self.owner, &[subtask_id], next)?;
        sync_task_completion(&mut *self.store, self.owner, subtask.task_id)?;
        subtask.completed_at = next;
        Ok(subtask)
    }

    /// Flips a task without subtasks between complete and open.  Tasks that
    /// have subtasks are left alone and `false` is returned.
    pub fn toggle_task_done(&mut self, task_id: TaskId, now: DateTime<Utc>) -> Result<bool> {
        let task = self.task(task_id)?;
        let subtasks = self.store.subtasks(self.owner, &[task_id])?;
        if !allows_direct_completion(subtasks.len()) {
            log::debug!(
                "Ignoring direct completion of {}, it has {} subtask(s)",
                task.title,
                subtasks.len()
            );
            return Ok(false);
        }

        let next = match task.completed_at {
            Some(_) => None,
            None => Some(now),
        };
        self.store.set_task_completion(self.owner, &[task_id], next)?;
        Ok(true)
    }

    /// Clears the completion of a task and of every one of its subtasks.
    pub fn reopen(&mut self, task_id: TaskId) -> Result<()> {
        let task = self.task(task_id)?;
        let subtask_ids = self
            .store
            .subtasks(self.owner, &[task_id])?
            .into_iter()
            .map(|sub| sub.id);
        let plan = Reconciler::reopen(task_id, subtask_ids);

        if !plan.subtask_ids.is_empty() {
            self.store
                .set_subtask_completion(self.owner, &plan.subtask_ids, None)?;
        }
        self.store
            .set_task_completion(self.owner, &[plan.task_id], None)?;
        log::info!("Reopened task {}", task.title);
        Ok(())
    }

    fn task(&mut self, task_id: TaskId) -> Result<Task> {
        match self.store.tasks_by_id(self.owner, &[task_id])?.into_iter().next() {
            Some(task) => Ok(task),
            None => bail!("No task found with id {task_id:?}"),
        }
    }
}

/// Brings a task's completion in line with its subtasks.  Has to run after
/// every change to a subtask's completion, for that subtask's parent.
///
/// Tasks without subtasks are completed directly and are not touched.
pub fn sync_task_completion<S: Store + ?Sized>(
    store: &mut S,
    owner: UserId,
    task_id: TaskId,
) -> Result<()> {
    let subtasks = store.subtasks(owner, &[task_id])?;
    if subtasks.is_empty() {
        return Ok(());
    }
    let Some(task) = store.tasks_by_id(owner, &[task_id])?.into_iter().next() else {
        bail!("No task found with id {task_id:?}");
    };

    let derived = derived_completion(&subtasks);
    if task.completed_at.is_some() != derived.is_some() {
        log::debug!("Task {} completion derived as {derived:?}", task.title);
        store.set_task_completion(owner, &[task_id], derived)?;
    }
    Ok(())
}

fn non_empty_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        bail!("Titles cannot be empty");
    }
    Ok(title)
}
