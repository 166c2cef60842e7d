// SPDX-License-Identifier: MPL-2.0

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use itertools::Itertools;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// An inclusive range of calendar days shown by a heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("window start {start} is after window end {end}");
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending with (and including) `today`.
    pub fn trailing(today: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            bail!("a heatmap window must cover at least one day");
        }
        let Some(start) = today.checked_sub_days(Days::new(u64::from(days) - 1)) else {
            bail!("window of {days} days before {today} is out of range");
        };
        Self::new(start, today)
    }

    /// January to June, or July to December, of the given year.
    pub fn half_year(year: i32, half: Half) -> Result<Self> {
        let (start, end) = match half {
            Half::First => ((1, 1), (6, 30)),
            Half::Second => ((7, 1), (12, 31)),
        };
        match (
            NaiveDate::from_ymd_opt(year, start.0, start.1),
            NaiveDate::from_ymd_opt(year, end.0, end.1),
        ) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => bail!("year {year} is out of range"),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// The Sunday at or before the window start.
    pub fn grid_start(&self) -> NaiveDate {
        let offset = self.start.weekday().num_days_from_sunday();
        self.start - Days::new(offset.into())
    }

    /// The Saturday at or after the window end.
    pub fn grid_end(&self) -> NaiveDate {
        let offset = 6 - self.end.weekday().num_days_from_sunday();
        self.end + Days::new(offset.into())
    }
}

/// Buckets a relative value into one of five intensity levels.
pub fn level(value: f64, max: f64) -> u8 {
    if value > 0.0 && max > 0.0 {
        let ratio = value / max;
        if ratio >= 0.75 {
            4
        } else if ratio >= 0.5 {
            3
        } else if ratio >= 0.25 {
            2
        } else {
            1
        }
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Day {
    pub date: NaiveDate,
    pub value: f64,
    pub level: u8,
    /// false for the padding days that only exist to fill out the first and
    /// last weeks of the grid
    pub in_window: bool,
}

/// A run of consecutive grid columns whose weeks start in the same month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSegment {
    /// zero-based month (0 = January)
    pub month0: u32,
    pub columns: usize,
}

impl MonthSegment {
    /// Single-column runs are left unlabelled so neighbouring labels don't
    /// collide.
    pub fn label(&self) -> Option<&'static str> {
        (self.columns >= 2).then(|| MONTH_LABELS[self.month0 as usize])
    }
}

/// Day totals for a window, laid out as a Sunday-first week grid.
///
/// Nothing here is cached besides the per-day totals and their maximum, so
/// `weeks` and `month_segments` can be called any number of times.  Build a
/// new heatmap when the events or the window change.
#[derive(Debug, Clone)]
pub struct Heatmap {
    window: Window,
    totals: BTreeMap<NaiveDate, f64>,
    max: f64,
}

impl Heatmap {
    /// Sums `(timestamp, value)` events into days local to `tz`.  Events that
    /// fall outside of the window are dropped.
    pub fn new<Tz>(
        window: Window,
        events: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
        tz: &Tz,
    ) -> Self
    where
        Tz: TimeZone,
    {
        let mut totals = BTreeMap::new();
        for (timestamp, value) in events {
            let day = timestamp.with_timezone(tz).date_naive();
            if window.contains(day) {
                *totals.entry(day).or_insert(0.0) += value;
            }
        }
        let max = totals.values().copied().fold(0.0, f64::max);

        Self {
            window,
            totals,
            max,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn value(&self, day: NaiveDate) -> f64 {
        self.totals.get(&day).copied().unwrap_or(0.0)
    }

    pub fn day(&self, date: NaiveDate) -> Day {
        let value = self.value(date);
        Day {
            date,
            value,
            level: level(value, self.max),
            in_window: self.window.contains(date),
        }
    }

    pub fn week_count(&self) -> usize {
        let days = (self.window.grid_end() - self.window.grid_start()).num_days() + 1;
        (days / 7) as usize
    }

    /// Grid columns, oldest first.
    pub fn weeks(&self) -> impl Iterator<Item = [Day; 7]> + '_ {
        let grid_start = self.window.grid_start();
        (0..self.week_count()).map(move |week| {
            let sunday = grid_start + Days::new(week as u64 * 7);
            std::array::from_fn(|weekday| self.day(sunday + Days::new(weekday as u64)))
        })
    }

    pub fn month_segments(&self) -> Vec<MonthSegment> {
        let grid_start = self.window.grid_start();
        (0..self.week_count())
            .map(|week| (grid_start + Days::new(week as u64 * 7)).month0())
            .dedup_with_count()
            .map(|(columns, month0)| MonthSegment { month0, columns })
            .collect()
    }
}
