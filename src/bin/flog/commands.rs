// SPDX-License-Identifier: MPL-2.0

use anyhow::{anyhow, Context as _, Result};
use chrono::{NaiveTime, SubsecRound as _, Utc};
use focuslog::{
    activity,
    auth::AuthContext,
    board::Board,
    commands::{Heatmap, History, Signin, TaskCommand},
    config::Config,
    heatmap::{self, Window},
    history,
    ids::Ids,
    model::{SubtaskId, TaskId, UserId},
    parse::{parse_since, parse_window},
    print::{print_heatmap, print_history, print_tasks},
    store::SqliteStore,
};

/// Opens the database for the signed-in user.
pub fn open(config: &Config) -> Result<(SqliteStore, UserId)> {
    let auth = AuthContext::load(&config.session_path);
    let owner = auth.current_user_id()?;
    let store = SqliteStore::open(&config.database_path)?;
    Ok((store, owner))
}

pub fn signin(config: Config, signin: Signin) -> Result<()> {
    let mut store = SqliteStore::open(&config.database_path)?;
    let mut auth = AuthContext::load(&config.session_path);
    auth.sign_in(&mut store, &signin.email, Utc::now().round_subsecs(0))?;
    Ok(())
}

pub fn signout(config: Config) -> Result<()> {
    let mut auth = AuthContext::load(&config.session_path);
    if !auth.sign_out()? {
        log::warn!("Nobody is signed in");
    }
    Ok(())
}

pub fn whoami(config: Config) -> Result<()> {
    let auth = AuthContext::load(&config.session_path);
    match auth.session() {
        Some(session) => println!("{}", session.email),
        None => log::warn!("Nobody is signed in"),
    }
    Ok(())
}

pub fn task(config: Config, command: TaskCommand) -> Result<()> {
    let (mut store, owner) = open(&config)?;
    let ids = Ids::new()?;
    let mut board = Board::new(&mut store, owner);
    let now = Utc::now().round_subsecs(0);

    match command {
        TaskCommand::Add(add) => {
            let task = board.add_task(&add.title, now)?;
            println!("({})  {}", ids.encode(task.id)?, task.title);
        }
        TaskCommand::Sub(add) => {
            let task_id: TaskId = ids.decode(&add.task)?;
            let subtask = board.add_subtask(task_id, &add.title, now)?;
            println!("({})  {}", ids.encode(subtask.id)?, subtask.title);
        }
        TaskCommand::Ls(ls) => {
            let tz = config.timezone()?;
            let tz = &tz;
            let view = board.load()?;
            let mut stdout = std::io::stdout().lock();
            print_tasks(&mut stdout, &view, &ids, ls.all, &tz)?;
        }
        TaskCommand::Done(done) => {
            let subtask_id: SubtaskId = ids.decode(&done.subtask)?;
            let subtask = board.toggle_subtask_done(subtask_id, now)?;
            if subtask.is_complete() {
                log::info!("Marked {} as done", subtask.title);
            } else {
                log::info!("Marked {} as not done", subtask.title);
            }
        }
        TaskCommand::Check(check) => {
            let task_id: TaskId = ids.decode(&check.task)?;
            if board.toggle_task_done(task_id, now)? {
                log::info!("Toggled task {}", check.task);
            } else {
                log::info!("Task {} is completed through its subtasks", check.task);
            }
        }
        TaskCommand::Rename(rename) => {
            let subtask_id: SubtaskId = ids.decode(&rename.subtask)?;
            let subtask = board.rename_subtask(subtask_id, &rename.title)?;
            log::info!("Renamed subtask to {}", subtask.title);
        }
        TaskCommand::Reopen(reopen) => {
            let task_id: TaskId = ids.decode(&reopen.task)?;
            board.reopen(task_id)?;
        }
    }
    Ok(())
}

pub fn history(config: Config, history: History) -> Result<()> {
    let (mut store, owner) = open(&config)?;
    let tz = config.timezone()?;
    let tz = &tz;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let since = history
        .since
        .map(|since| {
            parse_since(&since, &tz, today).ok_or_else(|| anyhow!("could not parse since date {since}"))
        })
        .transpose()?;

    let days = history::load(&mut store, owner, since, &tz).context("Could not load history")?;
    let mut stdout = std::io::stdout().lock();
    print_history(&mut stdout, &days, &tz)?;
    Ok(())
}

pub fn heatmap(config: Config, args: Heatmap) -> Result<()> {
    let (mut store, owner) = open(&config)?;
    let tz = config.timezone()?;
    let tz = &tz;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let window = match &args.window {
        Some(text) => parse_window(text, today)?,
        None => Window::trailing(today, config.heatmap_days)?,
    };
    // a day early, so events late on the first local day aren't missed
    let since = window
        .start()
        .pred_opt()
        .unwrap_or(window.start())
        .and_time(NaiveTime::MIN)
        .and_utc();

    let events = activity::events(&mut store, owner, args.mode, since)
        .context("Could not load activity")?;
    let heatmap = heatmap::Heatmap::new(window, events, &tz);

    let mut stdout = std::io::stdout().lock();
    print_heatmap(&mut stdout, &heatmap, args.mode)?;
    Ok(())
}
