use camino::Utf8Path;
use serde::Serialize;
use time::OffsetDateTime;

use super::disharmony::{RankedDisharmony, RankingOutcome, SkippedCandidate};

/// The short row printed per class unless `--details` is given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisharmonySummary {
    pub class_name: String,
    pub priority: u32,
    pub change_proneness_rank: u32,
    pub effort_rank: u32,
    pub method_count: u32,
    #[serde(with = "super::timestamp")]
    pub most_recent_commit_time: OffsetDateTime,
    pub commit_count: u32,
}

impl From<&RankedDisharmony> for DisharmonySummary {
    fn from(d: &RankedDisharmony) -> Self {
        Self {
            class_name: d.class_name().to_string(),
            priority: d.priority(),
            change_proneness_rank: d.change_proneness_rank(),
            effort_rank: d.effort_rank(),
            method_count: d.method_count(),
            most_recent_commit_time: d.most_recent_commit_time(),
            commit_count: d.commit_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisharmonyRow {
    Summary(DisharmonySummary),
    Detailed(RankedDisharmony),
}

/// JSON document written by `rank`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankResponse {
    Ranked {
        source_root: String,
        classes_analyzed: usize,
        candidates: usize,
        /// Ranked before `--limit` was applied
        ranked: usize,
        disharmonies: Vec<DisharmonyRow>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<SkippedCandidate>,
    },
    NoDisharmonies {
        source_root: String,
        classes_analyzed: usize,
    },
}

impl RankResponse {
    /// Order by priority (highest first), keep at most `limit` rows and pick the row view.
    pub fn from_outcome(
        source_root: &Utf8Path,
        outcome: RankingOutcome,
        details: bool,
        limit: Option<usize>,
    ) -> Self {
        let source_root = source_root.to_string();
        match outcome {
            RankingOutcome::NoDisharmonies { classes_analyzed } => Self::NoDisharmonies {
                source_root,
                classes_analyzed,
            },
            RankingOutcome::Ranked(report) => {
                let report = report.sorted_by_priority();
                let ranked = report.disharmonies.len();
                let disharmonies = report
                    .disharmonies
                    .into_iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|d| {
                        if details {
                            DisharmonyRow::Detailed(d)
                        } else {
                            DisharmonyRow::Summary(DisharmonySummary::from(&d))
                        }
                    })
                    .collect();
                Self::Ranked {
                    source_root,
                    classes_analyzed: report.classes_analyzed,
                    candidates: report.candidates,
                    ranked,
                    disharmonies,
                    skipped: report.skipped,
                }
            }
        }
    }
}
