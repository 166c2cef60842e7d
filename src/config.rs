// SPDX-License-Identifier: MPL-2.0

use std::{fs::read_to_string, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context as _, Result};
use tzfile::Tz;

const APP_NAME: &str = "focuslog";

pub fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let config_toml: PartialConfig = config_path
        .or_else(|| dirs::config_local_dir().map(|dir| dir.join(APP_NAME).join("config.toml")))
        .and_then(|path| {
            log::debug!("Reading configuration at path {:?}", &path);
            match read_to_string(&path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => Some(config),
                    Err(err) => {
                        log::warn!("Could not parse config at path {:?} {err}", path);
                        None
                    }
                },
                Err(err) => {
                    log::trace!(
                        "Could not read path {path:?} (assuming no config file set yet) {err}"
                    );
                    None
                }
            }
        })
        .unwrap_or_default();

    let data_dir = dirs::data_local_dir().map(|dir| dir.join(APP_NAME));
    let database_path = config_toml
        .database_path
        .or_else(|| data_dir.as_ref().map(|dir| dir.join("focuslog.db")))
        .ok_or_else(|| anyhow!("OS data directory could not be determined, use config file to set database_path"))?;
    log::trace!("Config: database_path is {:?}", &database_path);

    let session_path = config_toml
        .session_path
        .or_else(|| data_dir.as_ref().map(|dir| dir.join("session.toml")))
        .ok_or_else(|| anyhow!("OS data directory could not be determined, use config file to set session_path"))?;
    log::trace!("Config: session_path is {:?}", &session_path);

    Ok(Config {
        database_path,
        session_path,
        tick: Duration::from_millis(config_toml.tick_millis.unwrap_or(250).max(10)),
        heatmap_days: config_toml.heatmap_days.unwrap_or(365).max(1),
        timezone: config_toml.timezone,
    })
}

pub struct Config {
    pub database_path: PathBuf,
    pub session_path: PathBuf,
    /// how often the running timer redraws
    pub tick: Duration,
    /// default heatmap window, ending today
    pub heatmap_days: u32,
    timezone: Option<String>,
}

impl Config {
    /// The configured zone, or the system's own.
    pub fn timezone(&self) -> Result<Tz> {
        match &self.timezone {
            Some(name) => Tz::named(name).with_context(|| format!("Unknown timezone {name:?}")),
            None => Tz::local().context("Could not determine the local timezone"),
        }
    }
}

#[derive(Default, serde::Deserialize)]
struct PartialConfig {
    database_path: Option<PathBuf>,
    session_path: Option<PathBuf>,
    tick_millis: Option<u64>,
    heatmap_days: Option<u32>,
    timezone: Option<String>,
}
