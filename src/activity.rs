// SPDX-License-Identifier: MPL-2.0

//! Event sources for the heatmap.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::model::UserId;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// hours spent in focus sessions, by the day each session started
    #[default]
    Hours,
    /// tasks and subtasks completed, by the day they were completed
    Items,
}

/// `(timestamp, value)` events for the user since `since`, ready for
/// [`crate::heatmap::Heatmap::new`].
pub fn events<S: Store + ?Sized>(
    store: &mut S,
    owner: UserId,
    mode: Mode,
    since: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, f64)>> {
    match mode {
        Mode::Hours => Ok(store
            .entries(owner, Some(since))
            .context("Could not load entries")?
            .into_iter()
            .map(|entry| (entry.started_at, entry.duration_seconds() as f64 / 3600.0))
            .collect()),
        Mode::Items => Ok(store
            .completions(owner, since)
            .context("Could not load completions")?
            .into_iter()
            .map(|at| (at, 1.0))
            .collect()),
    }
}
