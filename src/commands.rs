use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::activity::Mode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    /// increase the verbosity
    ///
    /// This flag can be used multiple times to increase the amount of information
    /// produced by flog
    #[arg(global = true, short, long, action = clap::ArgAction::Count, help_heading = "Logging")]
    pub verbose: u8,

    /// output no logging
    ///
    /// Setting quiet disables all logging to stderr.  Data will only be printed
    /// to stdout, and only for commands that output information as their main
    /// action.
    #[arg(global = true, long, action = clap::ArgAction::SetTrue, help_heading = "Logging")]
    pub quiet: bool,

    /// path to the configuration file
    ///
    /// Defaults to focuslog/config.toml in the OS's local configuration
    /// directory.
    #[arg(global = true, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with an email address
    ///
    /// The user is created on their first sign-in.  Every other command acts
    /// on the signed-in user's tasks and sessions.
    #[clap(aliases = &["login"])]
    Signin(Signin),

    /// Sign out the current user
    #[clap(aliases = &["logout"])]
    Signout,

    /// Show the signed-in user
    Whoami,

    /// Manage tasks and their subtasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Run a focus session
    ///
    /// Starts an interactive timer.  While it runs, tasks and subtasks can be
    /// checked off by their number.  Once stopped, a note can be added and
    /// the session is saved together with everything that was checked.
    #[clap(aliases = &["focus", "start"])]
    Timer,

    /// List saved sessions, grouped by day
    ///
    /// By default, shows every session.  Use --since to only show recent
    /// ones.
    #[clap(aliases = &["ls", "log"])]
    History(History),

    /// Show activity as a calendar heatmap
    Heatmap(Heatmap),
}

#[derive(Args, Debug)]
pub struct Signin {
    pub email: String,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a new task
    Add(AddTask),

    /// Add a subtask to an active task
    ///
    /// A task with subtasks is complete once all of its subtasks are.
    Sub(AddSubtask),

    /// List tasks with their subtasks and ids
    #[clap(aliases = &["list"])]
    Ls(ListTasks),

    /// Mark a subtask done, or open it again if it is already done
    Done(SubtaskRef),

    /// Mark a task without subtasks done, or open it again
    Check(TaskRef),

    /// Rename a subtask
    Rename(RenameSubtask),

    /// Reopen a completed task and all of its subtasks
    Reopen(TaskRef),
}

#[derive(Args, Debug)]
pub struct AddTask {
    pub title: String,
}

#[derive(Args, Debug)]
pub struct AddSubtask {
    /// id of the parent task
    pub task: String,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct ListTasks {
    /// also show completed tasks
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct TaskRef {
    /// task id, as shown by `flog task ls`
    pub task: String,
}

#[derive(Args, Debug)]
pub struct SubtaskRef {
    /// subtask id, as shown by `flog task ls`
    pub subtask: String,
}

#[derive(Args, Debug)]
pub struct RenameSubtask {
    /// subtask id, as shown by `flog task ls`
    pub subtask: String,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct History {
    /// earliest day to show
    ///
    /// Can be an ISO-8601 date (2025-03-01), "today", "yesterday", or a
    /// relative range such as 7d, 2w, 3m or 1y.
    #[arg(short, long)]
    pub since: Option<String>,
}

#[derive(Args, Debug)]
pub struct Heatmap {
    /// what each day's colour is based on
    #[arg(short, long, value_enum, default_value_t = Mode::Hours)]
    pub mode: Mode,

    /// days to show
    ///
    /// Either a number of days ending today (365d), half of a year
    /// (2025-h1, 2025-h2) or an inclusive range (2025-01-01..2025-03-31).
    /// Defaults to the heatmap_days config value.
    #[arg(short, long)]
    pub window: Option<String>,
}
