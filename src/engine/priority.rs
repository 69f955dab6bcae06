//! Priority policies: turning an effort rank and a change-proneness rank into a score.
//!
//! Ranks count from the worst candidate (1 = most effort, 1 = most change-prone),
//! which reads backwards for a score. Policies therefore work on *levels*:
//! `level = max_rank + 1 - rank`, so a larger level always means "more".
//!
//! Every policy must be monotonic: raising the change level never lowers the
//! score, and raising the effort level never raises it.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::error::RankError;

/// Rank position of one candidate within the extents of the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPosition {
    pub effort_rank: u32,
    pub max_effort_rank: u32,
    pub change_proneness_rank: u32,
    pub max_change_proneness_rank: u32,
}

impl RankPosition {
    /// 1 for the least structurally severe candidate, `max_effort_rank` for the most.
    pub fn effort_level(&self) -> f64 {
        f64::from(self.max_effort_rank + 1 - self.effort_rank)
    }

    /// 1 for the least change-prone candidate, `max_change_proneness_rank` for the most.
    pub fn change_level(&self) -> f64 {
        f64::from(self.max_change_proneness_rank + 1 - self.change_proneness_rank)
    }
}

/// Scores a candidate; higher scores are refactored first.
pub trait PriorityPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, position: &RankPosition) -> f64;
}

/// Favors quick wins: frequently changed classes that are cheap to fix
/// relative to the worst offenders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickWin {
    pub effort_weight: f64,
}

impl Default for QuickWin {
    fn default() -> Self {
        Self { effort_weight: 1.0 }
    }
}

impl PriorityPolicy for QuickWin {
    fn name(&self) -> &'static str {
        "quick-win"
    }

    fn score(&self, position: &RankPosition) -> f64 {
        position.change_level() - self.effort_weight * position.effort_level()
    }
}

/// Independent weights for both signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weighted {
    pub change_weight: f64,
    pub effort_weight: f64,
}

impl PriorityPolicy for Weighted {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn score(&self, position: &RankPosition) -> f64 {
        self.change_weight * position.change_level() - self.effort_weight * position.effort_level()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    QuickWin,
    Weighted,
}

/// `[priority]` section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub policy: PolicyKind,
    pub effort_weight: f64,
    pub change_weight: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::QuickWin,
            effort_weight: 1.0,
            change_weight: 1.0,
        }
    }
}

impl PriorityConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("effort_weight", self.effort_weight),
            ("change_weight", self.change_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                bail!(RankError::invalid_config(format!(
                    "priority.{name} must be a finite, non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }

    /// Build the configured policy.
    pub fn build(&self) -> Result<Box<dyn PriorityPolicy>> {
        self.validate()?;
        Ok(match self.policy {
            PolicyKind::QuickWin => Box::new(QuickWin {
                effort_weight: self.effort_weight,
            }),
            PolicyKind::Weighted => Box::new(Weighted {
                change_weight: self.change_weight,
                effort_weight: self.effort_weight,
            }),
        })
    }
}
