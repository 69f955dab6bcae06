use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::engine::calculator::CostBenefitCalculator;
use crate::engine::filter::DisharmonyFilter;
use crate::engine::history::GitHistoryProvider;
use crate::engine::metrics::ReportMetricsProvider;
use crate::error::RankError;
use crate::models::report::RankResponse;

// ---------------------------------------------------------------------------
// AppService: wires configuration to the ranking engine
// ---------------------------------------------------------------------------

pub struct AppService {
    config: Config,
}

/// Parameters for a ranking run.
pub struct RankParams<'a> {
    pub dir: &'a str,
    pub metrics: Option<&'a str>,
    pub details: bool,
    pub limit: Option<usize>,
}

impl Default for AppService {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AppService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    // -----------------------------------------------------------------------
    // Validation helpers
    // -----------------------------------------------------------------------

    /// Validate and canonicalize the source root. Returns the canonical path.
    fn validate_dir(&self, dir: &str) -> Result<Utf8PathBuf> {
        let canonical = std::fs::canonicalize(dir).map_err(|_| {
            warn!(dir = dir, "validate_dir: directory not found");
            RankError::invalid_source_root(dir)
        })?;
        if !canonical.is_dir() {
            warn!(dir = dir, "validate_dir: not a directory");
            return Err(RankError::invalid_source_root(dir).into());
        }
        Utf8PathBuf::from_path_buf(canonical).map_err(|_| RankError::invalid_source_root(dir).into())
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    /// Rank the God class candidates of a repository.
    pub fn rank(&self, p: &RankParams<'_>) -> Result<RankResponse> {
        debug!(
            dir = p.dir,
            metrics = ?p.metrics,
            details = p.details,
            limit = ?p.limit,
            "rank called"
        );
        self.config.validate()?;
        let source_root = self.validate_dir(p.dir)?;

        let mut metrics = ReportMetricsProvider::new(self.config.metrics.clone());
        if let Some(report) = p.metrics {
            metrics = metrics.with_report(Utf8Path::new(report));
        }
        let history = GitHistoryProvider::new(self.config.history.clone());
        let calculator = CostBenefitCalculator::new(
            metrics,
            history,
            DisharmonyFilter::new(self.config.thresholds),
            self.config.priority.build()?,
        );

        let outcome = calculator.calculate(&source_root)?;
        let response = RankResponse::from_outcome(&source_root, outcome, p.details, p.limit);
        debug!(
            dir = p.dir,
            ranked = matches!(response, RankResponse::Ranked { .. }),
            "rank completed"
        );
        Ok(response)
    }
}
