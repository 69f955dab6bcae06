use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use time::OffsetDateTime;

use super::history::ChangeHistory;
use super::metrics::ClassMetrics;

/// Dense ranks computed for one candidate. Rank 1 is always the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateRanks {
    pub wmc: u32,
    pub atfd: u32,
    pub tcc: u32,
    pub effort: u32,
    pub commit_count: u32,
    pub recency: u32,
    pub frequency: u32,
    pub change_proneness: u32,
}

/// A God class candidate joined with its history, ranks and priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDisharmony {
    class_name: String,
    path: Utf8PathBuf,
    priority: u32,
    score: f64,
    change_proneness_rank: u32,
    effort_rank: u32,
    wmc: u32,
    wmc_rank: u32,
    atfd: u32,
    atfd_rank: u32,
    tcc: f64,
    tcc_rank: u32,
    method_count: u32,
    commit_count: u32,
    commit_count_rank: u32,
    recency_rank: u32,
    frequency_rank: u32,
    #[serde(with = "super::timestamp")]
    first_commit_time: OffsetDateTime,
    #[serde(with = "super::timestamp")]
    most_recent_commit_time: OffsetDateTime,
}

impl RankedDisharmony {
    pub(crate) fn assemble(
        metrics: &ClassMetrics,
        history: &ChangeHistory,
        ranks: CandidateRanks,
        score: f64,
        priority: u32,
    ) -> Self {
        Self {
            class_name: metrics.class_name.clone(),
            path: history.path().to_path_buf(),
            priority,
            score,
            change_proneness_rank: ranks.change_proneness,
            effort_rank: ranks.effort,
            wmc: metrics.wmc,
            wmc_rank: ranks.wmc,
            atfd: metrics.atfd,
            atfd_rank: ranks.atfd,
            tcc: metrics.tcc,
            tcc_rank: ranks.tcc,
            method_count: metrics.method_count,
            commit_count: history.commit_count(),
            commit_count_rank: ranks.commit_count,
            recency_rank: ranks.recency,
            frequency_rank: ranks.frequency,
            first_commit_time: history.first_commit_time(),
            most_recent_commit_time: history.most_recent_commit_time(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Unique position in the refactoring order; higher means fix first.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Raw output of the priority policy the run used.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn change_proneness_rank(&self) -> u32 {
        self.change_proneness_rank
    }

    pub fn effort_rank(&self) -> u32 {
        self.effort_rank
    }

    pub fn wmc(&self) -> u32 {
        self.wmc
    }

    pub fn wmc_rank(&self) -> u32 {
        self.wmc_rank
    }

    pub fn atfd(&self) -> u32 {
        self.atfd
    }

    pub fn atfd_rank(&self) -> u32 {
        self.atfd_rank
    }

    pub fn tcc(&self) -> f64 {
        self.tcc
    }

    pub fn tcc_rank(&self) -> u32 {
        self.tcc_rank
    }

    pub fn method_count(&self) -> u32 {
        self.method_count
    }

    pub fn commit_count(&self) -> u32 {
        self.commit_count
    }

    pub fn commit_count_rank(&self) -> u32 {
        self.commit_count_rank
    }

    pub fn recency_rank(&self) -> u32 {
        self.recency_rank
    }

    pub fn frequency_rank(&self) -> u32 {
        self.frequency_rank
    }

    pub fn first_commit_time(&self) -> OffsetDateTime {
        self.first_commit_time
    }

    pub fn most_recent_commit_time(&self) -> OffsetDateTime {
        self.most_recent_commit_time
    }
}

/// Why a candidate was left out of the ranked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Tracked by the metrics report but absent from version-control history
    MissingHistory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
    pub class_name: String,
    pub path: Utf8PathBuf,
    pub reason: SkipReason,
}

/// A completed ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    /// Classes the metrics provider reported
    pub classes_analyzed: usize,
    /// Classes that passed the disharmony filter
    pub candidates: usize,
    pub disharmonies: Vec<RankedDisharmony>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedCandidate>,
}

impl RankingReport {
    /// Presentation order: highest priority first.
    pub fn sorted_by_priority(mut self) -> Self {
        self.disharmonies.sort_by(|a, b| b.priority.cmp(&a.priority));
        self
    }
}

/// Result of a run. `NoDisharmonies` is a clean codebase, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankingOutcome {
    Ranked(RankingReport),
    NoDisharmonies { classes_analyzed: usize },
}

impl RankingOutcome {
    pub fn report(&self) -> Option<&RankingReport> {
        match self {
            Self::Ranked(report) => Some(report),
            Self::NoDisharmonies { .. } => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::NoDisharmonies { .. })
    }
}
