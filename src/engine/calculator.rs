use std::collections::{BTreeMap, HashSet};

use anyhow::{Result, bail};
use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::engine::filter::DisharmonyFilter;
use crate::engine::history::HistoryProvider;
use crate::engine::metrics::MetricsProvider;
use crate::engine::priority::{PriorityPolicy, RankPosition};
use crate::engine::rank::{RankDirection, dense_ranks, max_rank};
use crate::error::{ErrorCode, RankError};
use crate::models::disharmony::{
    CandidateRanks, RankedDisharmony, RankingOutcome, RankingReport, SkipReason, SkippedCandidate,
};
use crate::models::history::{ChangeHistory, HistoryIndex, normalize_path};
use crate::models::metrics::ClassMetrics;

/// Ranks God class candidates by cost (structural effort) against benefit
/// (change proneness).
pub struct CostBenefitCalculator<M, H> {
    metrics: M,
    history: H,
    filter: DisharmonyFilter,
    policy: Box<dyn PriorityPolicy>,
}

impl<M: MetricsProvider, H: HistoryProvider> CostBenefitCalculator<M, H> {
    pub fn new(
        metrics: M,
        history: H,
        filter: DisharmonyFilter,
        policy: Box<dyn PriorityPolicy>,
    ) -> Self {
        Self {
            metrics,
            history,
            filter,
            policy,
        }
    }

    /// Collect metrics and history for `source_root`, then rank every disharmony.
    ///
    /// Both collectors run concurrently and must both succeed before ranking
    /// starts; a failure in either aborts the run.
    pub fn calculate(&self, source_root: &Utf8Path) -> Result<RankingOutcome> {
        debug!(source_root = %source_root, policy = self.policy.name(), "calculate called");
        let (metrics, history) = rayon::join(
            || self.metrics.extract(source_root),
            || self.history.collect(source_root),
        );
        let metrics = metrics?;
        let history = history?;
        debug!(
            classes = metrics.len(),
            histories = history.len(),
            "collection completed"
        );
        rank_candidates(metrics, &history, &self.filter, self.policy.as_ref())
    }
}

/// Filter, join and rank fully materialized inputs.
pub fn rank_candidates(
    classes: Vec<ClassMetrics>,
    history: &HistoryIndex,
    filter: &DisharmonyFilter,
    policy: &dyn PriorityPolicy,
) -> Result<RankingOutcome> {
    let classes_analyzed = classes.len();
    let candidates = filter.filter(classes);
    if candidates.is_empty() {
        info!(classes_analyzed, "no disharmonies found");
        return Ok(RankingOutcome::NoDisharmonies { classes_analyzed });
    }
    ensure_unique(&candidates)?;

    let candidate_count = candidates.len();
    let mut joined: Vec<(ClassMetrics, &ChangeHistory)> = Vec::with_capacity(candidate_count);
    let mut skipped = Vec::new();
    for class in candidates {
        match history.history(&class.path) {
            Some(h) => joined.push((class, h)),
            None => {
                warn!(
                    class = %class.class_name,
                    path = %class.path,
                    "no version-control history for candidate, excluding it"
                );
                skipped.push(SkippedCandidate {
                    class_name: class.class_name,
                    path: normalize_path(class.path.as_str()),
                    reason: SkipReason::MissingHistory,
                });
            }
        }
    }

    let disharmonies = rank_joined(&joined, policy);
    info!(
        classes_analyzed,
        candidates = candidate_count,
        ranked = disharmonies.len(),
        skipped = skipped.len(),
        "ranking completed"
    );
    Ok(RankingOutcome::Ranked(RankingReport {
        classes_analyzed,
        candidates: candidate_count,
        disharmonies,
        skipped,
    }))
}

/// Paths and class names are join keys; a repeat makes the join undefined.
fn ensure_unique(candidates: &[ClassMetrics]) -> Result<()> {
    let mut paths = HashSet::new();
    let mut names = HashSet::new();
    for c in candidates {
        if !paths.insert(normalize_path(c.path.as_str())) {
            bail!(RankError::new(
                ErrorCode::DuplicateCandidate,
                format!("more than one candidate class declared in {}", c.path),
            ));
        }
        if !names.insert(c.class_name.as_str()) {
            bail!(RankError::new(
                ErrorCode::DuplicateCandidate,
                format!("class {} reported more than once", c.class_name),
            ));
        }
    }
    Ok(())
}

fn rank_joined(
    joined: &[(ClassMetrics, &ChangeHistory)],
    policy: &dyn PriorityPolicy,
) -> Vec<RankedDisharmony> {
    if joined.is_empty() {
        return Vec::new();
    }

    // Effort: structural severity
    let wmc = rank_signal(joined, RankDirection::HigherIsWorse, |m, _| f64::from(m.wmc));
    let atfd = rank_signal(joined, RankDirection::HigherIsWorse, |m, _| f64::from(m.atfd));
    let tcc = rank_signal(joined, RankDirection::LowerIsWorse, |m, _| m.tcc);
    let effort = combine(&[&wmc, &atfd, &tcc]);

    // Change proneness: how often and how lately the file moves
    let commits = rank_signal(joined, RankDirection::HigherIsWorse, |_, h| {
        f64::from(h.commit_count())
    });
    let recency = rank_signal(joined, RankDirection::HigherIsWorse, |_, h| {
        h.most_recent_commit_time().unix_timestamp() as f64
    });
    let frequency = rank_signal(joined, RankDirection::HigherIsWorse, |_, h| {
        h.commit_frequency()
    });
    let change = combine(&[&commits, &recency, &frequency]);

    let max_effort_rank = max_rank(&effort);
    let max_change_proneness_rank = max_rank(&change);

    let mut scored: Vec<(&ClassMetrics, &ChangeHistory, CandidateRanks, f64)> = joined
        .iter()
        .map(|(m, h)| {
            let key = m.class_name.as_str();
            let ranks = CandidateRanks {
                wmc: wmc[key],
                atfd: atfd[key],
                tcc: tcc[key],
                effort: effort[key],
                commit_count: commits[key],
                recency: recency[key],
                frequency: frequency[key],
                change_proneness: change[key],
            };
            let score = policy.score(&RankPosition {
                effort_rank: ranks.effort,
                max_effort_rank,
                change_proneness_rank: ranks.change_proneness,
                max_change_proneness_rank,
            });
            (m, *h, ranks, score)
        })
        .collect();

    // Total order: score descending, class name ascending
    scored.sort_by(|a, b| {
        b.3.total_cmp(&a.3)
            .then_with(|| a.0.class_name.cmp(&b.0.class_name))
    });

    let total = scored.len() as u32;
    let mut ranked: Vec<RankedDisharmony> = scored
        .into_iter()
        .enumerate()
        .map(|(position, (m, h, ranks, score))| {
            RankedDisharmony::assemble(m, h, ranks, score, total - position as u32)
        })
        .collect();
    ranked.sort_by(|a, b| a.class_name().cmp(b.class_name()));
    ranked
}

fn rank_signal<'a>(
    joined: &'a [(ClassMetrics, &ChangeHistory)],
    direction: RankDirection,
    value: impl Fn(&ClassMetrics, &ChangeHistory) -> f64,
) -> BTreeMap<&'a str, u32> {
    dense_ranks(
        joined
            .iter()
            .map(|(m, h)| (m.class_name.as_str(), value(m, *h))),
        direction,
    )
}

/// Sum per-signal ranks and re-rank the sums; the smallest sum is the worst.
fn combine<'a>(signals: &[&BTreeMap<&'a str, u32>]) -> BTreeMap<&'a str, u32> {
    let Some(first) = signals.first() else {
        return BTreeMap::new();
    };
    dense_ranks(
        first.keys().map(|&key| {
            let sum: u32 = signals.iter().map(|s| s[key]).sum();
            (key, f64::from(sum))
        }),
        RankDirection::LowerIsWorse,
    )
}
