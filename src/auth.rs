// SPDX-License-Identifier: MPL-2.0

//! The signed-in user.
//!
//! The CLI has no long-lived process to hold a login, so the current session
//! lives in a small TOML file.  An [`AuthContext`] is loaded once at startup
//! and passed to whatever needs the current user.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::UserId;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i32,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AuthContext {
    path: PathBuf,
    session: Option<Session>,
}

impl AuthContext {
    /// Reads the session file at `path`.  A missing or unreadable file means
    /// nobody is signed in.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(session) => Some(session),
                Err(err) => {
                    log::warn!("Ignoring unreadable session file {path:?} {err}");
                    None
                }
            },
            Err(err) => {
                log::trace!("No session at {path:?} (assuming signed out) {err}");
                None
            }
        };
        Self { path, session }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user_id(&self) -> Result<UserId> {
        self.session
            .as_ref()
            .map(|session| UserId(session.user_id))
            .ok_or_else(|| anyhow!("Not signed in, use `flog signin EMAIL` first"))
    }

    /// Signs in as `email`, creating the user if they are new, and remembers
    /// the session for later commands.
    pub fn sign_in<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<&Session> {
        let email = normalize_email(email)?;
        let user = store.upsert_user(&email, now)?;
        let session = Session {
            user_id: user.id.0,
            email: user.email,
            signed_in_at: now,
        };
        write_session(&self.path, &session)?;
        log::info!("Signed in as {}", session.email);
        Ok(self.session.insert(session))
    }

    /// Forgets the current session.  Returns whether anybody was signed in.
    pub fn sign_out(&mut self) -> Result<bool> {
        let Some(session) = self.session.take() else {
            return Ok(false);
        };
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("Could not remove {:?}", self.path))
            }
        }
        log::info!("Signed out {}", session.email);
        Ok(true)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => bail!("{email:?} is not an email address"),
    }
}

fn write_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create directory {parent:?}"))?;
    }
    let contents = toml::to_string(session)?;
    fs::write(path, contents).with_context(|| format!("Could not write session to {path:?}"))?;
    Ok(())
}
