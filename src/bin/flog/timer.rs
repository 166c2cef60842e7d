// SPDX-License-Identifier: MPL-2.0

//! The interactive focus timer.

use std::{
    io::Write as _,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use focuslog::{
    config::Config,
    format::format_duration,
    guard::{self, LeaveGuard, LEAVE_MESSAGE},
    print::{checklist, print_checklist, print_summary, ChecklistRow},
    recorder::{CommitError, Phase, Recorder},
};

use crate::commands::open;

const HELP: &str = "\
Commands:
  s, start        start the timer
  p, stop         stop the timer
  1, 2, ...       check or uncheck a task or subtask by its number
  l, list         show the checklist again
  n TEXT          set the note for this session
  c, save         save the stopped session
  x, cancel       discard the stopped session
  q, quit         leave
  h, help         show this help";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Start,
    Stop,
    Toggle(usize),
    List,
    Note(String),
    Save,
    Cancel,
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command.to_lowercase().as_str() {
        "s" | "start" => Input::Start,
        "p" | "stop" => Input::Stop,
        "l" | "list" | "" => Input::List,
        "n" | "note" => Input::Note(rest.trim().to_string()),
        "c" | "save" | "commit" => Input::Save,
        "x" | "cancel" => Input::Cancel,
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "help" | "?" => Input::Help,
        number => match number.parse::<usize>() {
            Ok(number) if number > 0 => Input::Toggle(number),
            _ => Input::Unknown(line.to_string()),
        },
    }
}

/// Redraws the elapsed time on stderr until stopped.  Only reads its own
/// copy of the start instant.
struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    fn start(started_at: DateTime<Utc>, tick: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = std::thread::spawn({
            let stop = Arc::clone(&stop);
            move || {
                while !stop.load(Ordering::Relaxed) {
                    let elapsed = (Utc::now() - started_at).num_seconds();
                    let mut stderr = std::io::stderr().lock();
                    let _ = write!(stderr, "\r{} ", format_duration(elapsed));
                    let _ = stderr.flush();
                    drop(stderr);
                    std::thread::sleep(tick);
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        eprintln!();
    }
}

pub fn run(config: Config) -> Result<()> {
    let (mut store, owner) = open(&config)?;
    let tz = config.timezone()?;
    let tz = &tz;
    let guard = guard::detect();

    let mut recorder = Recorder::new(owner);
    recorder.reload(&mut store)?;
    let mut ticker: Option<Ticker> = None;

    let mut stdout = std::io::stdout();
    print_checklist(&mut stdout, recorder.reconciler())?;
    println!("\n{HELP}");

    loop {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            if recorder.phase() != Phase::Idle {
                log::warn!("Input closed, the current session was not saved");
            }
            break;
        }

        let now = Utc::now();
        match parse_input(&line) {
            Input::Start => {
                if recorder.phase() != Phase::Idle {
                    log::warn!("The timer is already started");
                    continue;
                }
                recorder.start(now);
                ticker = Some(Ticker::start(now, config.tick));
            }
            Input::Stop => {
                if !matches!(recorder.phase(), Phase::Running { .. }) {
                    log::warn!("The timer is not running");
                    continue;
                }
                ticker = None;
                recorder.stop(now);
                println!(
                    "Stopped at {}.  Add a note with `n TEXT`, then `c` to save or `x` to discard.",
                    format_duration(recorder.elapsed(now).num_seconds())
                );
            }
            Input::Toggle(number) => {
                if recorder.phase() == Phase::Idle {
                    log::warn!("Start the timer before checking anything off");
                    continue;
                }
                match checklist(recorder.reconciler()).get(number - 1) {
                    Some(ChecklistRow::Task(task_id)) => recorder.reconciler_mut().toggle_task(*task_id),
                    Some(ChecklistRow::Subtask(subtask_id)) => {
                        recorder.reconciler_mut().toggle_subtask(*subtask_id)
                    }
                    None => {
                        log::warn!("There is no item {number}");
                        continue;
                    }
                }
                print_checklist(&mut stdout, recorder.reconciler())?;
            }
            Input::List => print_checklist(&mut stdout, recorder.reconciler())?,
            Input::Note(note) => {
                if !matches!(recorder.phase(), Phase::AwaitingNote { .. }) {
                    log::warn!("Stop the timer before adding a note");
                    continue;
                }
                recorder.set_note(note);
            }
            Input::Save => match recorder.commit(&mut store, now) {
                Ok(summary) => {
                    print_summary(&mut stdout, &summary, &tz)?;
                    print_checklist(&mut stdout, recorder.reconciler())?;
                }
                Err(CommitError::NotReady) => log::warn!("Stop the timer before saving"),
                Err(err @ CommitError::Entry(_)) => {
                    log::error!("{err:#}, use `c` to try again");
                }
                Err(err @ CommitError::Linkage { .. }) => {
                    log::error!("{err:#}");
                    print_checklist(&mut stdout, recorder.reconciler())?;
                }
            },
            Input::Cancel => {
                if !matches!(recorder.phase(), Phase::AwaitingNote { .. }) {
                    log::warn!("Only a stopped session can be discarded");
                    continue;
                }
                recorder.cancel();
                log::info!("Discarded the session");
            }
            Input::Quit => {
                if recorder.phase() == Phase::Idle || guard.confirm_leave(LEAVE_MESSAGE) {
                    break;
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Unknown(text) => log::warn!("Unknown command {text:?}, use `h` for help"),
        }
    }

    drop(ticker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("s\n"), Input::Start);
        assert_eq!(parse_input("STOP"), Input::Stop);
        assert_eq!(parse_input(" 3 "), Input::Toggle(3));
        assert_eq!(parse_input(""), Input::List);
        assert_eq!(parse_input("c"), Input::Save);
        assert_eq!(parse_input("x"), Input::Cancel);
        assert_eq!(parse_input("q"), Input::Quit);
    }

    #[test]
    fn notes_keep_the_rest_of_the_line() {
        assert_eq!(
            parse_input("n finished the  outline\n"),
            Input::Note("finished the  outline".into())
        );
        assert_eq!(parse_input("n"), Input::Note(String::new()));
    }

    #[test]
    fn unknown_input_is_reported() {
        assert_eq!(parse_input("0"), Input::Unknown("0".into()));
        assert_eq!(parse_input("jump"), Input::Unknown("jump".into()));
    }
}
