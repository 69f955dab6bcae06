use std::collections::HashMap;

use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::RankError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Normalize a repository-relative path so metrics and history agree on the join key.
pub fn normalize_path(path: &str) -> Utf8PathBuf {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    Utf8PathBuf::from(normalized)
}

/// Version-control history of a single file.
///
/// Only constructible through [`ChangeHistory::new`], so a value always has at
/// least one commit and a first commit no later than the most recent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeHistory {
    path: Utf8PathBuf,
    commit_count: u32,
    #[serde(with = "super::timestamp")]
    first_commit_time: OffsetDateTime,
    #[serde(with = "super::timestamp")]
    most_recent_commit_time: OffsetDateTime,
}

impl ChangeHistory {
    pub fn new(
        path: &str,
        commit_count: u32,
        first_commit_time: OffsetDateTime,
        most_recent_commit_time: OffsetDateTime,
    ) -> Result<Self> {
        if commit_count == 0 {
            bail!(RankError::history(format!(
                "history for {path} must contain at least one commit"
            )));
        }
        if first_commit_time > most_recent_commit_time {
            bail!(RankError::history(format!(
                "history for {path} has its first commit after its most recent commit"
            )));
        }
        Ok(Self {
            path: normalize_path(path),
            commit_count,
            first_commit_time,
            most_recent_commit_time,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn commit_count(&self) -> u32 {
        self.commit_count
    }

    pub fn first_commit_time(&self) -> OffsetDateTime {
        self.first_commit_time
    }

    pub fn most_recent_commit_time(&self) -> OffsetDateTime {
        self.most_recent_commit_time
    }

    /// Time between the first and the most recent commit.
    pub fn span(&self) -> time::Duration {
        self.most_recent_commit_time - self.first_commit_time
    }

    /// Commits per day over the active span. Spans shorter than a day count as one day.
    pub fn commit_frequency(&self) -> f64 {
        let days = (self.span().as_seconds_f64() / SECONDS_PER_DAY).max(1.0);
        f64::from(self.commit_count) / days
    }
}

/// Change histories keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    entries: HashMap<Utf8PathBuf, ChangeHistory>,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a history, replacing any previous entry for the same path.
    pub fn insert(&mut self, history: ChangeHistory) {
        self.entries.insert(history.path.clone(), history);
    }

    /// Look up the history of `path`, or `None` when the file was never committed.
    pub fn history(&self, path: &Utf8Path) -> Option<&ChangeHistory> {
        self.entries.get(&normalize_path(path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ChangeHistory> for HistoryIndex {
    fn from_iter<I: IntoIterator<Item = ChangeHistory>>(iter: I) -> Self {
        let mut index = Self::new();
        for history in iter {
            index.insert(history);
        }
        index
    }
}
