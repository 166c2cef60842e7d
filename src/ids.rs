// SPDX-License-Identifier: MPL-2.0

//! Short public ids for the rows a user refers to on the command line.
//!
//! The row kind is encoded alongside the row id, so a subtask's id can't be
//! passed where a task's id is expected.

use anyhow::{anyhow, bail, Result};
use sqids::Sqids;

use crate::model::{SubtaskId, TaskId};

pub trait PublicId: Copy {
    const KIND: u64;
    const NAME: &'static str;

    fn raw(self) -> i32;
    fn from_raw(raw: i32) -> Self;
}

impl PublicId for TaskId {
    const KIND: u64 = 1;
    const NAME: &'static str = "task";

    fn raw(self) -> i32 {
        self.0
    }
    fn from_raw(raw: i32) -> Self {
        Self(raw)
    }
}

impl PublicId for SubtaskId {
    const KIND: u64 = 2;
    const NAME: &'static str = "subtask";

    fn raw(self) -> i32 {
        self.0
    }
    fn from_raw(raw: i32) -> Self {
        Self(raw)
    }
}

pub struct Ids {
    sqids: Sqids,
}

impl Ids {
    pub fn new() -> Result<Self> {
        let sqids = Sqids::builder().min_length(5).build()?;
        Ok(Self { sqids })
    }

    pub fn encode<I: PublicId>(&self, id: I) -> Result<String> {
        let raw = u64::try_from(id.raw())?;
        Ok(self.sqids.encode(&[I::KIND, raw])?)
    }

    pub fn decode<I: PublicId>(&self, text: &str) -> Result<I> {
        let text = text.trim();
        let numbers = self.sqids.decode(text);
        let [kind, raw] = numbers[..] else {
            bail!("{text:?} is not a valid id");
        };
        if kind != I::KIND {
            bail!("{text:?} is not a {} id", I::NAME);
        }
        // sqids accepts several spellings of the same numbers, only take ours
        if self.sqids.encode(&numbers).ok().as_deref() != Some(text) {
            bail!("{text:?} is not a valid id");
        }
        let raw = i32::try_from(raw).map_err(|_| anyhow!("{text:?} is not a valid id"))?;
        Ok(I::from_raw(raw))
    }
}
