// SPDX-License-Identifier: MPL-2.0

pub mod activity;
pub mod auth;
pub mod board;
pub mod commands;
pub mod config;
pub mod format;
pub mod guard;
pub mod heatmap;
pub mod history;
pub mod ids;
pub mod model;
pub mod parse;
pub mod print;
pub mod reconcile;
pub mod recorder;
pub mod store;
