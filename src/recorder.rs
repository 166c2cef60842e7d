// SPDX-License-Identifier: MPL-2.0

use std::fmt::{Display, Formatter};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::board::sync_task_completion;
use crate::model::{Entry, TaskId, UserId};
use crate::reconcile::{CommitPlan, Reconciler, SummaryGroup};
use crate::store::{Store, TaskFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running {
        started_at: DateTime<Utc>,
    },
    AwaitingNote {
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
    },
}

/// What was saved, for showing back to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub note: String,
    pub groups: Vec<SummaryGroup>,
}

#[derive(Debug)]
pub enum CommitError {
    /// The timer hasn't been started and stopped yet.
    NotReady,
    /// The entry could not be saved.  Nothing was written and the session can
    /// be committed again.
    Entry(anyhow::Error),
    /// The entry was saved but linking or completing its tasks failed.  The
    /// entry stays saved and the session is over.
    Linkage { entry: Entry, source: anyhow::Error },
}

impl Display for CommitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitError::NotReady => write!(f, "the timer has not been stopped yet"),
            CommitError::Entry(err) => write!(f, "failed to save entry: {err}"),
            CommitError::Linkage { source, .. } => {
                write!(f, "saved entry but failed to link tasks: {source}")
            }
        }
    }
}

impl std::error::Error for CommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommitError::NotReady => None,
            CommitError::Entry(err) | CommitError::Linkage { source: err, .. } => {
                Some(err.as_ref())
            }
        }
    }
}

/// A focus timer for one user, moving from `Idle` to `Running` to
/// `AwaitingNote` and back to `Idle` once the session is saved or cancelled.
///
/// Instants are always handed in by the caller.  The elapsed time shown while
/// running is only for display: a saved entry always spans from the start
/// instant to the instant it was committed.
pub struct Recorder {
    owner: UserId,
    phase: Phase,
    note: String,
    reconciler: Reconciler,
}

impl Recorder {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            phase: Phase::Idle,
            note: String::new(),
            reconciler: Reconciler::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    /// Loads the active tasks and all of their subtasks.  Any selection made
    /// so far is dropped.
    pub fn reload<S: Store + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        let tasks = store.tasks(self.owner, TaskFilter::Active)?;
        let ids: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
        let subtasks = store.subtasks(self.owner, &ids)?;
        log::trace!(
            "Loaded {} active task(s) with {} subtask(s)",
            tasks.len(),
            subtasks.len()
        );
        self.reconciler = Reconciler::new(tasks, subtasks);
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.phase != Phase::Idle {
            log::debug!("Ignoring start while {:?}", self.phase);
            return;
        }
        self.phase = Phase::Running { started_at: now };
        self.note.clear();
        self.reconciler.clear_selection();
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        let Phase::Running { started_at } = self.phase else {
            log::debug!("Ignoring stop while {:?}", self.phase);
            return;
        };
        self.phase = Phase::AwaitingNote {
            started_at,
            stopped_at: now,
        };
    }

    /// Drops the session without saving anything.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::AwaitingNote { .. }) {
            log::debug!("Ignoring cancel while {:?}", self.phase);
            return;
        }
        self.reset();
    }

    /// Time to display: counting while running, frozen once stopped.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.phase {
            Phase::Idle => Duration::zero(),
            Phase::Running { started_at } => (now - started_at).max(Duration::zero()),
            Phase::AwaitingNote {
                started_at,
                stopped_at,
            } => stopped_at - started_at,
        }
    }

    /// Saves the session as an entry ending at `now`, links and completes
    /// whatever was selected, then reloads the task list.
    pub fn commit<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<Summary, CommitError> {
        let Phase::AwaitingNote { started_at, .. } = self.phase else {
            return Err(CommitError::NotReady);
        };

        let note = self.note.trim().to_string();
        let entry = store
            .insert_entry(self.owner, started_at, now, &note)
            .map_err(CommitError::Entry)?;
        log::debug!("Saved entry {:?}", entry.id);

        let plan = self.reconciler.commit(entry.id, now);
        let summary = Summary {
            started_at,
            ended_at: now,
            duration_seconds: entry.duration_seconds(),
            note,
            groups: self.reconciler.summary(),
        };

        let applied = apply_plan(store, self.owner, &plan);

        self.reset();
        if let Err(err) = self.reload(store) {
            log::warn!("Could not reload tasks after saving: {err:#}");
            if applied.is_ok() {
                self.reconciler.absorb(&plan);
            }
        }

        match applied {
            Ok(()) => Ok(summary),
            Err(source) => Err(CommitError::Linkage { entry, source }),
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.note.clear();
        self.reconciler.clear_selection();
    }
}

fn apply_plan<S: Store + ?Sized>(store: &mut S, owner: UserId, plan: &CommitPlan) -> Result<()> {
    if !plan.links.is_empty() {
        store.insert_links(&plan.links)?;
    }
    if !plan.subtask_ids.is_empty() {
        store.set_subtask_completion(owner, &plan.subtask_ids, Some(plan.completed_at))?;
    }
    if !plan.task_ids.is_empty() {
        store.set_task_completion(owner, &plan.task_ids, Some(plan.completed_at))?;
    }
    for task_id in plan.touched_parents() {
        sync_task_completion(store, owner, task_id)?;
    }
    Ok(())
}
