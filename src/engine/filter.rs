use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RankError;
use crate::models::metrics::ClassMetrics;

/// Floors a class must cross to count as a disharmony.
///
/// Defaults follow the Lanza–Marinescu God Class detection strategy:
/// WMC above 47, ATFD above 5, or TCC below 0.33. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// WMC must exceed this
    pub wmc: u32,
    /// ATFD must exceed this
    pub atfd: u32,
    /// TCC below this flags low cohesion on its own
    pub tcc: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            wmc: 47,
            atfd: 5,
            tcc: 0.33,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        if !self.tcc.is_finite() || !(0.0..=1.0).contains(&self.tcc) {
            bail!(RankError::invalid_config(format!(
                "tcc threshold must be a finite value in [0.0, 1.0], got {}",
                self.tcc
            )));
        }
        Ok(())
    }
}

/// Drops classes that show no God class symptom before they are ranked.
#[derive(Debug, Clone, Default)]
pub struct DisharmonyFilter {
    thresholds: Thresholds,
}

impl DisharmonyFilter {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Complex and coupled, or poorly cohesive.
    pub fn is_disharmony(&self, metrics: &ClassMetrics) -> bool {
        let t = &self.thresholds;
        (metrics.wmc > t.wmc && metrics.atfd > t.atfd) || metrics.tcc < t.tcc
    }

    pub fn filter(&self, classes: Vec<ClassMetrics>) -> Vec<ClassMetrics> {
        let total = classes.len();
        let candidates: Vec<ClassMetrics> = classes
            .into_iter()
            .filter(|m| self.is_disharmony(m))
            .collect();
        debug!(
            total = total,
            candidates = candidates.len(),
            wmc_threshold = self.thresholds.wmc,
            atfd_threshold = self.thresholds.atfd,
            tcc_threshold = self.thresholds.tcc,
            "disharmony filter applied"
        );
        candidates
    }
}
