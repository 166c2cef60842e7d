// SPDX-License-Identifier: MPL-2.0

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};

use crate::{
    activity::Mode,
    board::{BoardView, TaskCard},
    format::format_duration,
    heatmap::Heatmap,
    history::HistoryDay,
    ids::Ids,
    model::{SubtaskId, TaskId},
    recorder::Summary,
    reconcile::Reconciler,
};

const LEVEL_CELLS: [&str; 5] = ["··", "░░", "▒▒", "▓▓", "██"];
const PADDING_CELL: &str = "  ";
const WEEKDAY_LABELS: [&str; 7] = ["    ", "Mon ", "    ", "Wed ", "    ", "Fri ", "    "];
const ITEM_INDENT: &str = "                         ";

pub fn print_tasks<Tz>(
    writer: &mut impl Write,
    view: &BoardView,
    ids: &Ids,
    show_inactive: bool,
    tz: &Tz,
) -> Result<()>
where
    Tz: TimeZone,
{
    if view.active.is_empty() {
        writeln!(writer, "No active tasks.")?;
    }
    for card in &view.active {
        print_card(writer, card, ids)?;
    }

    if show_inactive && !view.inactive.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Completed")?;
        for card in &view.inactive {
            print_card(writer, card, ids)?;
            if let Some(completed_at) = card.task.completed_at {
                writeln!(
                    writer,
                    "{ITEM_INDENT}on {}",
                    date_string(&local(completed_at, tz))
                )?;
            }
        }
    }
    Ok(())
}

fn print_card(writer: &mut impl Write, card: &TaskCard, ids: &Ids) -> Result<()> {
    let mark = if card.task.is_active() { ' ' } else { 'x' };
    write!(
        writer,
        "({})  [{mark}] {}",
        ids.encode(card.task.id)?,
        card.task.title
    )?;
    if card.subtasks.is_empty() {
        writeln!(writer)?;
    } else {
        let done = card.subtasks.iter().filter(|sub| sub.is_complete()).count();
        writeln!(writer, "  ({done}/{})", card.subtasks.len())?;
    }

    for subtask in &card.subtasks {
        let mark = if subtask.is_complete() { 'x' } else { ' ' };
        writeln!(
            writer,
            "({})      [{mark}] {}",
            ids.encode(subtask.id)?,
            subtask.title
        )?;
    }
    Ok(())
}

pub fn print_history<Tz>(writer: &mut impl Write, days: &[HistoryDay], tz: &Tz) -> Result<()>
where
    Tz: TimeZone,
{
    if days.is_empty() {
        writeln!(writer, "No entries yet.")?;
        return Ok(());
    }

    for (index, day) in days.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        let weekday = &day.date.weekday().to_string()[..2];
        writeln!(
            writer,
            "{weekday} {}  {}",
            day.date.format("%e %b '%y"),
            format_duration(day.total_seconds())
        )?;

        for item in &day.entries {
            let entry = &item.entry;
            let mut note = entry.note.lines();
            let line = format!(
                "  {}-{}  {}  {}",
                local(entry.started_at, tz).format("%H:%M"),
                local(entry.ended_at, tz).format("%H:%M"),
                format_duration(entry.duration_seconds()),
                note.next().unwrap_or_default(),
            );
            writeln!(writer, "{}", line.trim_end())?;
            for rest in note {
                writeln!(writer, "{}", format!("{ITEM_INDENT}{rest}").trim_end())?;
            }
            for completed in &item.items {
                match &completed.subtask_title {
                    Some(subtask) => {
                        writeln!(writer, "{ITEM_INDENT}- {}: {subtask}", completed.task_title)?
                    }
                    None => writeln!(writer, "{ITEM_INDENT}- {}", completed.task_title)?,
                }
            }
        }
    }
    Ok(())
}

pub fn print_summary<Tz>(writer: &mut impl Write, summary: &Summary, tz: &Tz) -> Result<()>
where
    Tz: TimeZone,
{
    writeln!(
        writer,
        "Saved {} ({}-{})",
        format_duration(summary.duration_seconds),
        local(summary.started_at, tz).format("%H:%M"),
        local(summary.ended_at, tz).format("%H:%M"),
    )?;
    if !summary.note.is_empty() {
        writeln!(writer, "{}", summary.note)?;
    }
    if !summary.groups.is_empty() {
        writeln!(writer, "Completed:")?;
        for group in &summary.groups {
            if group.subtask_titles.is_empty() {
                writeln!(writer, "  {}", group.task_title)?;
            } else {
                writeln!(
                    writer,
                    "  {}: {}",
                    group.task_title,
                    group.subtask_titles.join(", ")
                )?;
            }
        }
    }
    Ok(())
}

pub fn print_heatmap(writer: &mut impl Write, heatmap: &Heatmap, mode: Mode) -> Result<()> {
    let window = heatmap.window();
    writeln!(writer, "{} to {}", window.start(), window.end())?;

    let mut header = String::from(WEEKDAY_LABELS[0]);
    for segment in heatmap.month_segments() {
        let width = segment.columns * PADDING_CELL.len();
        header.push_str(&format!("{:width$}", segment.label().unwrap_or_default()));
    }
    writeln!(writer, "{}", header.trim_end())?;

    let weeks: Vec<_> = heatmap.weeks().collect();
    for (weekday, label) in WEEKDAY_LABELS.iter().enumerate() {
        let mut row = String::from(*label);
        for week in &weeks {
            let day = &week[weekday];
            row.push_str(if day.in_window {
                LEVEL_CELLS[usize::from(day.level)]
            } else {
                PADDING_CELL
            });
        }
        writeln!(writer, "{}", row.trim_end())?;
    }

    let busiest = match mode {
        Mode::Hours => format_duration((heatmap.max() * 3600.0).round() as i64),
        Mode::Items => format!("{} items", heatmap.max() as i64),
    };
    writeln!(writer)?;
    writeln!(writer, "Less {} More  busiest day {busiest}", LEVEL_CELLS.concat())?;
    Ok(())
}

/// One numbered line of the timer's checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistRow {
    Task(TaskId),
    Subtask(SubtaskId),
}

/// Each active task followed by its subtasks, in the order they are printed.
pub fn checklist(reconciler: &Reconciler) -> Vec<ChecklistRow> {
    reconciler
        .tasks()
        .iter()
        .flat_map(|task| {
            std::iter::once(ChecklistRow::Task(task.id)).chain(
                reconciler
                    .subtasks_of(task.id)
                    .map(|subtask| ChecklistRow::Subtask(subtask.id)),
            )
        })
        .collect()
}

pub fn print_checklist(writer: &mut impl Write, reconciler: &Reconciler) -> Result<()> {
    if reconciler.tasks().is_empty() {
        writeln!(writer, "No active tasks.")?;
        return Ok(());
    }

    for (index, row) in checklist(reconciler).into_iter().enumerate() {
        let number = index + 1;
        match row {
            ChecklistRow::Task(task_id) => {
                let Some(task) = reconciler.task(task_id) else {
                    continue;
                };
                let mark = if reconciler.is_task_checked(task_id) {
                    'x'
                } else if reconciler.is_task_partially_selected(task_id) {
                    '~'
                } else {
                    ' '
                };
                writeln!(writer, "{number:>3}. [{mark}] {}", task.title)?;
            }
            ChecklistRow::Subtask(subtask_id) => {
                let Some(subtask) = reconciler.subtask(subtask_id) else {
                    continue;
                };
                let mark = if reconciler.is_subtask_checked(subtask_id) {
                    'x'
                } else {
                    ' '
                };
                let suffix = if reconciler.is_pre_completed(subtask_id) {
                    " (done)"
                } else {
                    ""
                };
                writeln!(writer, "     {number:>3}. [{mark}] {}{suffix}", subtask.title)?;
            }
        }
    }
    Ok(())
}

fn local<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    at.with_timezone(tz).naive_local()
}

fn date_string(at: &NaiveDateTime) -> String {
    let weekday = &at.weekday().to_string()[..2];
    format!("{weekday} {}", at.format("%e %b '%y"))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone as _};

    use super::*;
    use crate::heatmap::Window;
    use crate::history::{HistoryEntry, Item};
    use crate::model::{Entry, EntryId, Subtask, Task, UserId};
    use crate::reconcile::SummaryGroup;

    fn dt(day: u32, time: &str) -> DateTime<Utc> {
        let mut parts = time.split(':');
        let hour = parts.next().unwrap().parse().unwrap();
        let min = parts.next().unwrap().parse().unwrap();
        let sec = parts.next().unwrap().parse().unwrap();
        Utc.with_ymd_and_hms(2025, 5, day, hour, min, sec).unwrap()
    }

    fn task(id: i32, title: &str, completed_at: Option<DateTime<Utc>>) -> Task {
        Task {
            id: TaskId(id),
            user_id: UserId(1),
            title: title.into(),
            created_at: dt(1, "08:00:00"),
            completed_at,
        }
    }

    fn subtask(id: i32, task_id: i32, title: &str, completed: bool) -> Subtask {
        Subtask {
            id: SubtaskId(id),
            user_id: UserId(1),
            task_id: TaskId(task_id),
            title: title.into(),
            created_at: dt(1, "08:00:00"),
            completed_at: completed.then(|| dt(2, "09:00:00")),
        }
    }

    fn entry(id: i32, start: DateTime<Utc>, end: DateTime<Utc>, note: &str) -> Entry {
        Entry {
            id: EntryId(id),
            user_id: UserId(1),
            started_at: start,
            ended_at: end,
            note: note.into(),
        }
    }

    fn render(print: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        print(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn prints_tasks_with_progress() {
        let ids = Ids::new().unwrap();
        let view = BoardView {
            active: vec![
                TaskCard {
                    task: task(1, "report", None),
                    subtasks: vec![subtask(11, 1, "outline", true), subtask(12, 1, "draft", false)],
                },
                TaskCard {
                    task: task(2, "email", None),
                    subtasks: vec![],
                },
            ],
            inactive: vec![TaskCard {
                task: task(3, "taxes", Some(dt(12, "10:00:00"))),
                subtasks: vec![],
            }],
        };

        let result = render(|buffer| print_tasks(buffer, &view, &ids, true, &Utc));
        let id = |n: i32| ids.encode(TaskId(n)).unwrap();
        let sub = |n: i32| ids.encode(SubtaskId(n)).unwrap();
        assert_eq!(
            result,
            format!(
                "({})  [ ] report  (1/2)
({})      [x] outline
({})      [ ] draft
({})  [ ] email

Completed
({})  [x] taxes
                         on Mo 12 May '25
",
                id(1),
                sub(11),
                sub(12),
                id(2),
                id(3)
            )
        );

        let result = render(|buffer| print_tasks(buffer, &view, &ids, false, &Utc));
        assert!(!result.contains("taxes"));
    }

    #[test]
    fn prints_empty_task_lists() {
        let ids = Ids::new().unwrap();
        let result = render(|buffer| print_tasks(buffer, &BoardView::default(), &ids, true, &Utc));
        assert_eq!(result, "No active tasks.\n");
    }

    #[test]
    fn prints_history_grouped_by_day() {
        let days = vec![
            HistoryDay {
                date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
                entries: vec![
                    HistoryEntry {
                        entry: entry(2, dt(12, "14:00:00"), dt(12, "14:30:00"), "review\nand notes"),
                        items: vec![
                            Item {
                                task_title: "report".into(),
                                subtask_title: Some("outline".into()),
                            },
                            Item {
                                task_title: "email".into(),
                                subtask_title: None,
                            },
                        ],
                    },
                    HistoryEntry {
                        entry: entry(1, dt(12, "09:00:00"), dt(12, "10:15:30"), ""),
                        items: vec![],
                    },
                ],
            },
            HistoryDay {
                date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
                entries: vec![HistoryEntry {
                    entry: entry(0, dt(2, "07:00:00"), dt(2, "07:05:00"), "quick"),
                    items: vec![],
                }],
            },
        ];

        let result = render(|buffer| print_history(buffer, &days, &Utc));
        assert_eq!(
            result,
            "
Mo 12 May '25  01:45:30
  14:00-14:30  00:30:00  review
                         and notes
                         - report: outline
                         - email
  09:00-10:15  01:15:30

Fr  2 May '25  00:05:00
  07:00-07:05  00:05:00  quick
"
            .trim_start()
        );
    }

    #[test]
    fn prints_history_times_in_the_given_timezone() {
        let days = vec![HistoryDay {
            date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
            entries: vec![HistoryEntry {
                entry: entry(1, dt(12, "09:00:00"), dt(12, "10:00:00"), ""),
                items: vec![],
            }],
        }];
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let result = render(|buffer| print_history(buffer, &days, &tz));
        assert!(result.contains("  11:00-12:00  01:00:00\n"), "{result}");
    }

    #[test]
    fn prints_empty_history() {
        let result = render(|buffer| print_history(buffer, &[], &Utc));
        assert_eq!(result, "No entries yet.\n");
    }

    #[test]
    fn prints_summaries() {
        let summary = Summary {
            started_at: dt(12, "09:00:00"),
            ended_at: dt(12, "09:46:01"),
            duration_seconds: 46 * 60 + 1,
            note: "finished the report".into(),
            groups: vec![
                SummaryGroup {
                    task_title: "report".into(),
                    subtask_titles: vec!["outline".into(), "draft".into()],
                },
                SummaryGroup {
                    task_title: "email".into(),
                    subtask_titles: vec![],
                },
            ],
        };

        let result = render(|buffer| print_summary(buffer, &summary, &Utc));
        assert_eq!(
            result,
            "
Saved 00:46:01 (09:00-09:46)
finished the report
Completed:
  report: outline, draft
  email
"
            .trim_start()
        );
    }

    #[test]
    fn prints_heatmaps_as_week_columns() {
        let window = Window::new(
            NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 17).unwrap(),
        )
        .unwrap();
        let heatmap = Heatmap::new(
            window,
            [(dt(5, "09:00:00"), 2.0), (dt(14, "09:00:00"), 1.0)],
            &Utc,
        );

        let result = render(|buffer| print_heatmap(buffer, &heatmap, Mode::Hours));
        assert_eq!(
            result,
            "
2025-05-04 to 2025-05-17
    May
    ····
Mon ██··
    ····
Wed ··▓▓
    ····
Fri ····
    ····

Less ··░░▒▒▓▓██ More  busiest day 02:00:00
"
            .trim_start()
        );
    }

    #[test]
    fn heatmap_padding_days_are_blank() {
        // Tuesday to Thursday of a single week
        let window = Window::new(
            NaiveDate::from_ymd_opt(2025, 5, 6).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 8).unwrap(),
        )
        .unwrap();
        let heatmap = Heatmap::new(window, [(dt(7, "09:00:00"), 3.0)], &Utc);

        let result = render(|buffer| print_heatmap(buffer, &heatmap, Mode::Items));
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines[1], "");
        assert_eq!(&lines[2..9], ["", "Mon", "    ··", "Wed ██", "    ··", "Fri", ""]);
        assert!(result.ends_with("busiest day 3 items\n"));
    }

    #[test]
    fn checklist_numbers_tasks_and_subtasks() {
        let mut reconciler = Reconciler::new(
            vec![task(1, "report", None), task(2, "email", None)],
            vec![
                subtask(11, 1, "outline", true),
                subtask(12, 1, "draft", false),
                subtask(13, 1, "proofread", false),
            ],
        );
        reconciler.toggle_subtask(SubtaskId(12));

        assert_eq!(
            checklist(&reconciler),
            vec![
                ChecklistRow::Task(TaskId(1)),
                ChecklistRow::Subtask(SubtaskId(11)),
                ChecklistRow::Subtask(SubtaskId(12)),
                ChecklistRow::Subtask(SubtaskId(13)),
                ChecklistRow::Task(TaskId(2)),
            ]
        );

        let result = render(|buffer| print_checklist(buffer, &reconciler));
        assert_eq!(
            result,
            "  1. [~] report
       2. [x] outline (done)
       3. [x] draft
       4. [ ] proofread
  5. [ ] email
"
        );
    }
}
