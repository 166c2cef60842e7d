// SPDX-License-Identifier: MPL-2.0

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use itertools::Itertools;

use crate::model::{Entry, EntryId, SubtaskId, TaskId, UserId};
use crate::store::Store;

const MISSING_TASK: &str = "(task)";

/// Something completed during a session, as titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub task_title: String,
    pub subtask_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub entry: Entry,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDay {
    pub date: NaiveDate,
    /// newest first
    pub entries: Vec<HistoryEntry>,
}

impl HistoryDay {
    pub fn total_seconds(&self) -> i64 {
        self.entries
            .iter()
            .map(|item| item.entry.duration_seconds())
            .sum()
    }
}

/// Loads the user's entries started at or after `since`, with the titles of
/// everything completed in them, grouped into days local to `tz`.  Days are
/// newest first.
pub fn load<S, Tz>(
    store: &mut S,
    owner: UserId,
    since: Option<DateTime<Utc>>,
    tz: &Tz,
) -> Result<Vec<HistoryDay>>
where
    S: Store + ?Sized,
    Tz: TimeZone,
{
    let entries = store
        .entries(owner, since)
        .context("Could not load entries")?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let entry_ids: Vec<EntryId> = entries.iter().map(|entry| entry.id).collect();
    let links = store
        .links(&entry_ids)
        .context("Could not load entry links")?;

    let task_ids: Vec<TaskId> = links
        .iter()
        .map(|link| link.task_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let subtask_ids: Vec<SubtaskId> = links
        .iter()
        .filter_map(|link| link.subtask_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let task_titles: HashMap<TaskId, String> = store
        .tasks_by_id(owner, &task_ids)?
        .into_iter()
        .map(|task| (task.id, task.title))
        .collect();
    let subtask_titles: HashMap<SubtaskId, String> = if subtask_ids.is_empty() {
        HashMap::new()
    } else {
        store
            .subtasks_by_id(owner, &subtask_ids)?
            .into_iter()
            .map(|sub| (sub.id, sub.title))
            .collect()
    };

    let mut items_by_entry: HashMap<EntryId, Vec<Item>> = HashMap::new();
    for link in links {
        let item = Item {
            task_title: task_titles
                .get(&link.task_id)
                .cloned()
                .unwrap_or_else(|| MISSING_TASK.to_string()),
            subtask_title: link
                .subtask_id
                .and_then(|id| subtask_titles.get(&id).cloned()),
        };
        items_by_entry.entry(link.entry_id).or_default().push(item);
    }

    let days = entries
        .into_iter()
        .map(|entry| HistoryEntry {
            items: items_by_entry.remove(&entry.id).unwrap_or_default(),
            entry,
        })
        .chunk_by(|item| item.entry.started_at.with_timezone(tz).date_naive())
        .into_iter()
        .map(|(date, entries)| HistoryDay {
            date,
            entries: entries.collect(),
        })
        .collect();
    Ok(days)
}
