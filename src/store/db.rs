use std::fs::create_dir_all;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection as _;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel::{sql_query, Connection, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::schema::{entry_tasks, journal_entries, subtasks, tasks, users};

pub struct Conn(SqliteConnection);

impl Drop for Conn {
    fn drop(&mut self) {
        // best effort, lets SQLite refresh its statistics from this session's queries
        // See: https://sqlite.org/pragma.html#pragma_optimize
        let _ = sql_query("PRAGMA optimize;").execute(&mut self.0);
    }
}

pub fn establish_connection(database_url: impl AsRef<Path>) -> Result<Conn> {
    let database_url = database_url.as_ref();

    // SQLite creates the database file itself, but not any missing parent folders
    if let Some(parent) = database_url.parent() {
        create_dir_all(parent)
            .with_context(|| format!("could not create data directory {}", parent.display()))?;
    }

    // SQLite only accepts utf-8 or utf-16 paths, so a non-utf-8 path is
    // converted lossily here
    // See: https://github.com/diesel-rs/diesel/discussions/3069
    let database_url = database_url.to_string_lossy();

    log::trace!("Connecting to SQLite DB at {database_url}");
    let conn = SqliteConnection::establish(&database_url)?;
    prepare(conn)
}

pub fn establish_in_memory() -> Result<Conn> {
    log::trace!("Opening in-memory SQLite DB");
    prepare(SqliteConnection::establish(":memory:")?)
}

fn prepare(mut conn: SqliteConnection) -> Result<Conn> {
    conn.batch_execute(
        "PRAGMA application_id = 0x666c6f67;
        PRAGMA foreign_keys = TRUE;
        PRAGMA ignore_check_constraints = FALSE;",
    )?;
    log::trace!("Connection to SQLite DB successful");
    run_migrations(&mut conn)?;
    Ok(Conn(conn))
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_migrations(db: &mut SqliteConnection) -> Result<()> {
    let migrated = match db.run_pending_migrations(MIGRATIONS) {
        Ok(migrations) => migrations.len(),
        Err(_) => bail!("Could not update database to the latest version"),
    };

    if migrated > 0 {
        // the data may be laid out differently to when the last analysis ran
        // See: https://sqlite.org/pragma.html#pragma_optimize
        sql_query("PRAGMA optimize;").execute(db)?;
        log::trace!("Ran {migrated} migration(s) to update SQLite DB schema to latest version");
    }

    Ok(())
}

#[derive(Queryable, Identifiable, Selectable, Debug, PartialEq, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Identifiable, Selectable, Associations, Debug, PartialEq, Clone)]
#[diesel(table_name = tasks)]
#[diesel(belongs_to(UserRow, foreign_key = user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Identifiable, Selectable, Associations, Debug, PartialEq, Clone)]
#[diesel(table_name = subtasks)]
#[diesel(belongs_to(TaskRow, foreign_key = task_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SubtaskRow {
    pub id: i32,
    pub user_id: i32,
    pub task_id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Identifiable, Selectable, Debug, PartialEq, Clone)]
#[diesel(table_name = journal_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryRow {
    pub id: i32,
    pub user_id: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub note: String,
}

#[derive(Queryable, Selectable, Debug, PartialEq, Clone)]
#[diesel(table_name = entry_tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LinkRow {
    pub entry_id: i32,
    pub task_id: i32,
    pub subtask_id: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = entry_tasks)]
pub struct NewLink {
    pub entry_id: i32,
    pub task_id: i32,
    pub subtask_id: Option<i32>,
}

pub fn upsert_user(conn: &mut Conn, email: &str, now: DateTime<Utc>) -> Result<UserRow> {
    let user = diesel::insert_into(users::table)
        .values((users::email.eq(email), users::created_at.eq(now)))
        .on_conflict(users::email)
        .do_update()
        // "updates" the email to itself - a no-op, but it lets the returning
        // clause hand back the existing row
        .set(users::email.eq(excluded(users::email)))
        .returning(UserRow::as_returning())
        .get_result(&mut conn.0)?;
    Ok(user)
}

pub fn query_tasks(conn: &mut Conn, owner: i32, active_only: bool) -> Result<Vec<TaskRow>> {
    let mut query = tasks::table
        .filter(tasks::user_id.eq(owner))
        .select(TaskRow::as_select())
        .into_boxed();
    if active_only {
        query = query.filter(tasks::completed_at.is_null());
    }
    Ok(query
        .order((tasks::created_at, tasks::id))
        .load(&mut conn.0)?)
}

pub fn query_tasks_by_id(conn: &mut Conn, owner: i32, ids: &[i32]) -> Result<Vec<TaskRow>> {
    Ok(tasks::table
        .filter(tasks::user_id.eq(owner))
        .filter(tasks::id.eq_any(ids))
        .order((tasks::created_at, tasks::id))
        .select(TaskRow::as_select())
        .load(&mut conn.0)?)
}

pub fn query_subtasks(conn: &mut Conn, owner: i32, task_ids: &[i32]) -> Result<Vec<SubtaskRow>> {
    Ok(subtasks::table
        .filter(subtasks::user_id.eq(owner))
        .filter(subtasks::task_id.eq_any(task_ids))
        .order((subtasks::created_at, subtasks::id))
        .select(SubtaskRow::as_select())
        .load(&mut conn.0)?)
}

pub fn query_subtasks_by_id(conn: &mut Conn, owner: i32, ids: &[i32]) -> Result<Vec<SubtaskRow>> {
    Ok(subtasks::table
        .filter(subtasks::user_id.eq(owner))
        .filter(subtasks::id.eq_any(ids))
        .order((subtasks::created_at, subtasks::id))
        .select(SubtaskRow::as_select())
        .load(&mut conn.0)?)
}

pub fn insert_task(conn: &mut Conn, owner: i32, title: &str, now: DateTime<Utc>) -> Result<TaskRow> {
    let task = diesel::insert_into(tasks::table)
        .values((
            tasks::user_id.eq(owner),
            tasks::title.eq(title),
            tasks::created_at.eq(now),
        ))
        .returning(TaskRow::as_returning())
        .get_result(&mut conn.0)?;
    Ok(task)
}

pub fn insert_subtask(
    conn: &mut Conn,
    owner: i32,
    task_id: i32,
    title: &str,
    now: DateTime<Utc>,
) -> Result<SubtaskRow> {
    let parents: i64 = tasks::table
        .filter(tasks::id.eq(task_id))
        .filter(tasks::user_id.eq(owner))
        .count()
        .get_result(&mut conn.0)?;
    if parents < 1 {
        bail!("No task found with id {task_id}");
    }

    let subtask = diesel::insert_into(subtasks::table)
        .values((
            subtasks::user_id.eq(owner),
            subtasks::task_id.eq(task_id),
            subtasks::title.eq(title),
            subtasks::created_at.eq(now),
        ))
        .returning(SubtaskRow::as_returning())
        .get_result(&mut conn.0)?;
    Ok(subtask)
}

pub fn update_subtask_title(
    conn: &mut Conn,
    owner: i32,
    subtask_id: i32,
    title: &str,
) -> Result<SubtaskRow> {
    let subtask = diesel::update(subtasks::table)
        .filter(subtasks::id.eq(subtask_id))
        .filter(subtasks::user_id.eq(owner))
        .set(subtasks::title.eq(title))
        .returning(SubtaskRow::as_returning())
        .get_result(&mut conn.0)
        .optional()?;
    match subtask {
        Some(subtask) => Ok(subtask),
        None => bail!("No subtask found with id {subtask_id}"),
    }
}

pub fn set_task_completed_at(
    conn: &mut Conn,
    owner: i32,
    ids: &[i32],
    timestamp: Option<DateTime<Utc>>,
) -> Result<usize> {
    Ok(diesel::update(tasks::table)
        .filter(tasks::user_id.eq(owner))
        .filter(tasks::id.eq_any(ids))
        .set(tasks::completed_at.eq(timestamp))
        .execute(&mut conn.0)?)
}

pub fn set_subtask_completed_at(
    conn: &mut Conn,
    owner: i32,
    ids: &[i32],
    timestamp: Option<DateTime<Utc>>,
) -> Result<usize> {
    Ok(diesel::update(subtasks::table)
        .filter(subtasks::user_id.eq(owner))
        .filter(subtasks::id.eq_any(ids))
        .set(subtasks::completed_at.eq(timestamp))
        .execute(&mut conn.0)?)
}

pub fn insert_entry(
    conn: &mut Conn,
    owner: i32,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    note: &str,
) -> Result<EntryRow> {
    let entry = diesel::insert_into(journal_entries::table)
        .values((
            journal_entries::user_id.eq(owner),
            journal_entries::started_at.eq(started_at),
            journal_entries::ended_at.eq(ended_at),
            journal_entries::note.eq(note),
        ))
        .returning(EntryRow::as_returning())
        .get_result(&mut conn.0)?;
    Ok(entry)
}

pub fn insert_links(conn: &mut Conn, links: &[NewLink]) -> Result<usize> {
    Ok(diesel::insert_into(entry_tasks::table)
        .values(links)
        .execute(&mut conn.0)?)
}

pub fn query_entries(
    conn: &mut Conn,
    owner: i32,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<EntryRow>> {
    let mut query = journal_entries::table
        .filter(journal_entries::user_id.eq(owner))
        .select(EntryRow::as_select())
        .into_boxed();
    if let Some(since) = since {
        query = query.filter(journal_entries::started_at.ge(since));
    }
    Ok(query
        .order((journal_entries::started_at.desc(), journal_entries::id.desc()))
        .load(&mut conn.0)?)
}

pub fn query_links(conn: &mut Conn, entry_ids: &[i32]) -> Result<Vec<LinkRow>> {
    Ok(entry_tasks::table
        .filter(entry_tasks::entry_id.eq_any(entry_ids))
        .order(entry_tasks::id)
        .select(LinkRow::as_select())
        .load(&mut conn.0)?)
}

/// Completion timestamps of both tasks and subtasks since the given instant.
pub fn query_completions(
    conn: &mut Conn,
    owner: i32,
    since: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    let task_completions: Vec<Option<DateTime<Utc>>> = tasks::table
        .filter(tasks::user_id.eq(owner))
        .filter(tasks::completed_at.ge(since))
        .select(tasks::completed_at)
        .load(&mut conn.0)?;
    let subtask_completions: Vec<Option<DateTime<Utc>>> = subtasks::table
        .filter(subtasks::user_id.eq(owner))
        .filter(subtasks::completed_at.ge(since))
        .select(subtasks::completed_at)
        .load(&mut conn.0)?;

    Ok(task_completions
        .into_iter()
        .chain(subtask_completions)
        .flatten()
        .collect())
}
