// SPDX-License-Identifier: MPL-2.0

//! Which tasks and subtasks a focus session may mark as completed, and what
//! has to be written when it does.
//!
//! A task with subtasks is never completed directly: it is complete exactly
//! when all of its subtasks are.  Subtasks that were already complete when
//! the session began are shown as checked but can't be touched.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{EntryId, Link, Subtask, SubtaskId, Task, TaskId};

#[derive(Debug, Default, Clone)]
pub struct Reconciler {
    tasks: Vec<Task>,
    subtasks: HashMap<SubtaskId, Subtask>,
    /// subtask ids per task, in the order the subtasks were loaded
    subtasks_by_task: HashMap<TaskId, Vec<SubtaskId>>,
    pre_completed: HashSet<SubtaskId>,
    selected_subtasks: BTreeSet<SubtaskId>,
    selected_tasks: BTreeSet<TaskId>,
}

/// Everything a commit has to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub links: Vec<Link>,
    pub subtask_ids: Vec<SubtaskId>,
    pub task_ids: Vec<TaskId>,
    /// shared by both the subtask and task completions
    pub completed_at: DateTime<Utc>,
}

impl CommitPlan {
    /// Parents of the completed subtasks, whose own completion has to be
    /// derived again once the subtasks are stamped.
    pub fn touched_parents(&self) -> BTreeSet<TaskId> {
        self.links
            .iter()
            .filter(|link| link.subtask_id.is_some())
            .map(|link| link.task_id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReopenPlan {
    pub task_id: TaskId,
    pub subtask_ids: Vec<SubtaskId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryGroup {
    pub task_title: String,
    pub subtask_titles: Vec<String>,
}

impl Reconciler {
    /// `tasks` are the active tasks, `subtasks` every subtask under them
    /// whether complete or not.  Subtasks of unknown tasks are dropped.
    pub fn new(tasks: Vec<Task>, subtasks: Vec<Subtask>) -> Self {
        let known: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
        let mut subtasks_by_task: HashMap<TaskId, Vec<SubtaskId>> = HashMap::new();
        let mut pre_completed = HashSet::new();
        let mut by_id = HashMap::new();

        for subtask in subtasks {
            if !known.contains(&subtask.task_id) {
                log::debug!(
                    "Ignoring subtask {:?} of inactive task {:?}",
                    subtask.id,
                    subtask.task_id
                );
                continue;
            }
            subtasks_by_task
                .entry(subtask.task_id)
                .or_default()
                .push(subtask.id);
            if subtask.is_complete() {
                pre_completed.insert(subtask.id);
            }
            by_id.insert(subtask.id, subtask);
        }

        Self {
            tasks,
            subtasks: by_id,
            subtasks_by_task,
            pre_completed,
            selected_subtasks: BTreeSet::new(),
            selected_tasks: BTreeSet::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Subtasks of a task, in load order.
    pub fn subtasks_of(&self, task_id: TaskId) -> impl Iterator<Item = &Subtask> + '_ {
        self.subtask_ids(task_id)
            .iter()
            .filter_map(move |id| self.subtasks.get(id))
    }

    fn subtask_ids(&self, task_id: TaskId) -> &[SubtaskId] {
        self.subtasks_by_task
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn subtask(&self, subtask_id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.get(&subtask_id)
    }

    pub fn has_subtasks(&self, task_id: TaskId) -> bool {
        !self.subtask_ids(task_id).is_empty()
    }

    pub fn is_pre_completed(&self, subtask_id: SubtaskId) -> bool {
        self.pre_completed.contains(&subtask_id)
    }

    pub fn is_subtask_selected(&self, subtask_id: SubtaskId) -> bool {
        self.selected_subtasks.contains(&subtask_id)
    }

    /// Whether a subtask should be rendered as checked.
    pub fn is_subtask_checked(&self, subtask_id: SubtaskId) -> bool {
        self.is_pre_completed(subtask_id) || self.is_subtask_selected(subtask_id)
    }

    /// Whether a task should be rendered as checked.
    pub fn is_task_checked(&self, task_id: TaskId) -> bool {
        if self.has_subtasks(task_id) {
            self.is_task_fully_selected(task_id)
        } else {
            self.selected_tasks.contains(&task_id)
        }
    }

    pub fn is_task_fully_selected(&self, task_id: TaskId) -> bool {
        let ids = self.subtask_ids(task_id);
        !ids.is_empty() && ids.iter().all(|id| self.is_subtask_checked(*id))
    }

    pub fn is_task_partially_selected(&self, task_id: TaskId) -> bool {
        let ids = self.subtask_ids(task_id);
        ids.iter().any(|id| self.is_subtask_checked(*id)) && !self.is_task_fully_selected(task_id)
    }

    /// Selects every remaining subtask of the task, or clears them all if they
    /// were already selected.  Tasks without subtasks are selected directly.
    pub fn toggle_task(&mut self, task_id: TaskId) {
        if self.task(task_id).is_none() {
            log::debug!("Ignoring toggle of unknown task {task_id:?}");
            return;
        }

        if self.has_subtasks(task_id) {
            let mutable: Vec<SubtaskId> = self
                .subtask_ids(task_id)
                .iter()
                .copied()
                .filter(|id| !self.pre_completed.contains(id))
                .collect();
            let all_selected = !mutable.is_empty()
                && mutable.iter().all(|id| self.selected_subtasks.contains(id));

            for id in mutable {
                if all_selected {
                    self.selected_subtasks.remove(&id);
                } else {
                    self.selected_subtasks.insert(id);
                }
            }
            self.selected_tasks.remove(&task_id);
        } else if !self.selected_tasks.remove(&task_id) {
            self.selected_tasks.insert(task_id);
        }
    }

    pub fn toggle_subtask(&mut self, subtask_id: SubtaskId) {
        if !self.subtasks.contains_key(&subtask_id) {
            log::debug!("Ignoring toggle of unknown subtask {subtask_id:?}");
            return;
        }
        if self.pre_completed.contains(&subtask_id) {
            log::debug!("Ignoring toggle of already completed subtask {subtask_id:?}");
            return;
        }
        if !self.selected_subtasks.remove(&subtask_id) {
            self.selected_subtasks.insert(subtask_id);
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_subtasks.is_empty() || !self.selected_tasks.is_empty()
    }

    pub fn clear_selection(&mut self) {
        self.selected_subtasks.clear();
        self.selected_tasks.clear();
    }

    /// The rows and completion stamps for everything selected this session.
    pub fn commit(&self, entry_id: EntryId, completed_at: DateTime<Utc>) -> CommitPlan {
        let subtasks: Vec<&Subtask> = self
            .selected_subtasks
            .iter()
            .filter(|id| !self.pre_completed.contains(id))
            .filter_map(|id| self.subtasks.get(id))
            .collect();

        let mut links: Vec<Link> = subtasks
            .iter()
            .map(|subtask| Link {
                entry_id,
                task_id: subtask.task_id,
                subtask_id: Some(subtask.id),
            })
            .collect();
        links.extend(self.selected_tasks.iter().map(|task_id| Link {
            entry_id,
            task_id: *task_id,
            subtask_id: None,
        }));

        CommitPlan {
            links,
            subtask_ids: subtasks.iter().map(|subtask| subtask.id).collect(),
            task_ids: self.selected_tasks.iter().copied().collect(),
            completed_at,
        }
    }

    /// Folds a saved plan back in for when the tasks can't be loaded again.
    /// Its subtasks become pre-completed, and tasks it completed, directly or
    /// through their last subtask, drop out.
    pub fn absorb(&mut self, plan: &CommitPlan) {
        for id in &plan.subtask_ids {
            if let Some(subtask) = self.subtasks.get_mut(id) {
                subtask.completed_at = Some(plan.completed_at);
                self.pre_completed.insert(*id);
            }
        }

        let finished: HashSet<TaskId> = plan
            .task_ids
            .iter()
            .copied()
            .chain(plan.touched_parents().into_iter().filter(|task_id| {
                self.subtask_ids(*task_id)
                    .iter()
                    .all(|id| self.pre_completed.contains(id))
            }))
            .collect();
        for task_id in &finished {
            for id in self.subtasks_by_task.remove(task_id).unwrap_or_default() {
                self.subtasks.remove(&id);
                self.pre_completed.remove(&id);
            }
        }
        self.tasks.retain(|task| !finished.contains(&task.id));
        self.clear_selection();
    }

    /// What the session completed, grouped by task, for showing after a save.
    ///
    /// Already completed subtasks are listed alongside the new ones so each
    /// group shows the task's full progress.
    pub fn summary(&self) -> Vec<SummaryGroup> {
        self.tasks
            .iter()
            .filter_map(|task| {
                let subtask_titles: Vec<String> = self
                    .subtasks_of(task.id)
                    .filter(|subtask| self.is_subtask_checked(subtask.id))
                    .map(|subtask| subtask.title.clone())
                    .collect();
                let selected = self.selected_tasks.contains(&task.id);
                (selected || !subtask_titles.is_empty()).then(|| SummaryGroup {
                    task_title: task.title.clone(),
                    subtask_titles,
                })
            })
            .collect()
    }

    /// Clears a task and every one of its subtasks, whatever state they are in.
    pub fn reopen(task_id: TaskId, subtask_ids: impl IntoIterator<Item = SubtaskId>) -> ReopenPlan {
        ReopenPlan {
            task_id,
            subtask_ids: subtask_ids.into_iter().collect(),
        }
    }
}

/// Tasks with subtasks can only be completed through their subtasks.
pub fn allows_direct_completion(subtask_count: usize) -> bool {
    subtask_count == 0
}

/// The completion timestamp a task with subtasks should carry: the latest
/// subtask completion once every subtask is complete, otherwise none.
///
/// Returns `None` for an empty list too, but tasks without subtasks are
/// completed directly and should not be derived at all.
pub fn derived_completion(subtasks: &[Subtask]) -> Option<DateTime<Utc>> {
    subtasks
        .iter()
        .map(|subtask| subtask.completed_at)
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .max()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::model::UserId;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, hour, 0, 0).unwrap()
    }

    fn task(id: i32, title: &str) -> Task {
        Task {
            id: TaskId(id),
            user_id: UserId(1),
            title: title.into(),
            created_at: ts(8),
            completed_at: None,
        }
    }

    fn subtask(id: i32, task_id: i32, title: &str, completed: bool) -> Subtask {
        Subtask {
            id: SubtaskId(id),
            user_id: UserId(1),
            task_id: TaskId(task_id),
            title: title.into(),
            created_at: ts(8),
            completed_at: completed.then(|| ts(9)),
        }
    }

    /// task 1 has three subtasks (11 pre-completed), task 2 has none
    fn reconciler() -> Reconciler {
        Reconciler::new(
            vec![task(1, "write report"), task(2, "email bob")],
            vec![
                subtask(11, 1, "outline", true),
                subtask(12, 1, "draft", false),
                subtask(13, 1, "proofread", false),
            ],
        )
    }

    #[test]
    fn toggle_task_selects_all_remaining_subtasks() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(1));

        assert!(rec.is_subtask_selected(SubtaskId(12)));
        assert!(rec.is_subtask_selected(SubtaskId(13)));
        assert!(!rec.is_subtask_selected(SubtaskId(11)));
        assert!(rec.is_task_fully_selected(TaskId(1)));
        assert!(!rec.is_task_partially_selected(TaskId(1)));
    }

    #[test]
    fn toggle_task_twice_restores_the_selection() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(1));
        rec.toggle_task(TaskId(1));
        assert!(!rec.has_selection());
        assert!(rec.is_task_partially_selected(TaskId(1)));

        rec.toggle_task(TaskId(2));
        assert!(rec.is_task_checked(TaskId(2)));
        rec.toggle_task(TaskId(2));
        assert!(!rec.is_task_checked(TaskId(2)));
        assert!(!rec.has_selection());
    }

    #[test]
    fn toggle_task_completes_a_partial_selection_before_clearing() {
        let mut rec = reconciler();
        rec.toggle_subtask(SubtaskId(12));
        assert!(rec.is_task_partially_selected(TaskId(1)));

        rec.toggle_task(TaskId(1));
        assert!(rec.is_task_fully_selected(TaskId(1)));

        rec.toggle_task(TaskId(1));
        assert!(!rec.is_subtask_selected(SubtaskId(12)));
        assert!(!rec.is_subtask_selected(SubtaskId(13)));
    }

    #[test]
    fn pre_completed_subtasks_can_never_be_selected() {
        let mut rec = reconciler();
        rec.toggle_subtask(SubtaskId(11));
        assert!(!rec.is_subtask_selected(SubtaskId(11)));
        assert!(rec.is_subtask_checked(SubtaskId(11)));

        for _ in 0..3 {
            rec.toggle_task(TaskId(1));
            rec.toggle_subtask(SubtaskId(11));
            rec.toggle_subtask(SubtaskId(13));
            assert!(!rec.is_subtask_selected(SubtaskId(11)));
        }
    }

    #[test]
    fn task_whose_subtasks_are_all_pre_completed_has_nothing_to_toggle() {
        let mut rec = Reconciler::new(
            vec![task(1, "done already")],
            vec![subtask(11, 1, "a", true), subtask(12, 1, "b", true)],
        );
        assert!(rec.is_task_fully_selected(TaskId(1)));
        rec.toggle_task(TaskId(1));
        assert!(!rec.has_selection());
        assert!(rec.is_task_fully_selected(TaskId(1)));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(99));
        rec.toggle_subtask(SubtaskId(99));
        assert!(!rec.has_selection());
    }

    #[test]
    fn task_without_subtasks_is_never_partially_selected() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(2));
        assert!(!rec.is_task_fully_selected(TaskId(2)));
        assert!(!rec.is_task_partially_selected(TaskId(2)));
    }

    #[test]
    fn commit_links_only_subtasks_completed_this_session() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(1));
        let plan = rec.commit(EntryId(7), ts(17));

        assert_eq!(
            plan.links,
            vec![
                Link {
                    entry_id: EntryId(7),
                    task_id: TaskId(1),
                    subtask_id: Some(SubtaskId(12)),
                },
                Link {
                    entry_id: EntryId(7),
                    task_id: TaskId(1),
                    subtask_id: Some(SubtaskId(13)),
                },
            ]
        );
        assert_eq!(plan.subtask_ids, vec![SubtaskId(12), SubtaskId(13)]);
        assert!(plan.task_ids.is_empty());
        assert_eq!(plan.completed_at, ts(17));
        assert_eq!(plan.touched_parents(), BTreeSet::from([TaskId(1)]));
    }

    #[test]
    fn commit_links_tasks_without_subtasks_directly() {
        let mut rec = reconciler();
        rec.toggle_task(TaskId(2));
        rec.toggle_subtask(SubtaskId(13));
        let plan = rec.commit(EntryId(3), ts(12));

        assert_eq!(
            plan.links,
            vec![
                Link {
                    entry_id: EntryId(3),
                    task_id: TaskId(1),
                    subtask_id: Some(SubtaskId(13)),
                },
                Link {
                    entry_id: EntryId(3),
                    task_id: TaskId(2),
                    subtask_id: None,
                },
            ]
        );
        assert_eq!(plan.subtask_ids, vec![SubtaskId(13)]);
        assert_eq!(plan.task_ids, vec![TaskId(2)]);
    }

    #[test]
    fn commit_of_empty_selection_is_empty() {
        let plan = reconciler().commit(EntryId(1), ts(12));
        assert!(plan.is_empty());
        assert!(plan.subtask_ids.is_empty());
        assert!(plan.task_ids.is_empty());
    }

    #[test]
    fn summary_groups_checked_items_by_task() {
        let mut rec = reconciler();
        rec.toggle_subtask(SubtaskId(13));
        rec.toggle_task(TaskId(2));

        assert_eq!(
            rec.summary(),
            vec![
                SummaryGroup {
                    task_title: "write report".into(),
                    subtask_titles: vec!["outline".into(), "proofread".into()],
                },
                SummaryGroup {
                    task_title: "email bob".into(),
                    subtask_titles: vec![],
                },
            ]
        );
    }

    #[test]
    fn summary_lists_pre_completed_subtasks_without_a_selection() {
        assert_eq!(
            reconciler().summary(),
            vec![SummaryGroup {
                task_title: "write report".into(),
                subtask_titles: vec!["outline".into()],
            }]
        );
    }

    #[test]
    fn reopen_lists_every_subtask() {
        let plan = Reconciler::reopen(TaskId(1), [SubtaskId(11), SubtaskId(12)]);
        assert_eq!(plan.task_id, TaskId(1));
        assert_eq!(plan.subtask_ids, vec![SubtaskId(11), SubtaskId(12)]);
    }

    #[test]
    fn direct_completion_is_only_allowed_without_subtasks() {
        assert!(allows_direct_completion(0));
        assert!(!allows_direct_completion(1));
        assert!(!allows_direct_completion(3));
    }

    #[test]
    fn derived_completion_needs_every_subtask() {
        let mut subtasks = vec![subtask(11, 1, "a", true), subtask(12, 1, "b", false)];
        assert_eq!(derived_completion(&subtasks), None);

        subtasks[1].completed_at = Some(ts(15));
        assert_eq!(derived_completion(&subtasks), Some(ts(15)));
        assert_eq!(derived_completion(&[]), None);
    }

    #[test]
    fn absorbed_plans_make_their_items_read_only() {
        let mut rec = reconciler();
        rec.toggle_subtask(SubtaskId(12));
        rec.toggle_task(TaskId(2));
        let plan = rec.commit(EntryId(4), ts(12));
        rec.absorb(&plan);

        assert!(!rec.has_selection());
        assert!(rec.is_pre_completed(SubtaskId(12)));
        assert_eq!(rec.subtask(SubtaskId(12)).unwrap().completed_at, Some(ts(12)));
        assert!(rec.task(TaskId(2)).is_none());

        rec.toggle_subtask(SubtaskId(12));
        assert!(!rec.has_selection());

        rec.toggle_subtask(SubtaskId(13));
        let plan = rec.commit(EntryId(5), ts(13));
        rec.absorb(&plan);
        // the last subtask completes the parent too
        assert!(rec.tasks().is_empty());
        assert!(rec.subtask(SubtaskId(13)).is_none());
    }
}
