use anyhow::{Result, bail};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::RankError;

/// Structural metrics for one class, as written by an external static analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Fully qualified class name
    #[serde(alias = "className", alias = "class")]
    pub class_name: String,
    /// Source file declaring the class, relative to the repository root
    #[serde(alias = "filePath")]
    pub path: Utf8PathBuf,
    /// Weighted method count
    pub wmc: u32,
    /// Access to foreign data
    pub atfd: u32,
    /// Tight class cohesion in [0, 1]
    pub tcc: f64,
    #[serde(alias = "methodCount", default)]
    pub method_count: u32,
}

impl ClassMetrics {
    pub fn new(
        class_name: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        wmc: u32,
        atfd: u32,
        tcc: f64,
        method_count: u32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            path: path.into(),
            wmc,
            atfd,
            tcc,
            method_count,
        }
    }

    /// Reject records a ranking run cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.class_name.trim().is_empty() {
            bail!(RankError::metrics_report(format!(
                "class metrics for {} have an empty class name",
                self.path
            )));
        }
        if self.path.as_str().trim().is_empty() {
            bail!(RankError::metrics_report(format!(
                "class metrics for {} have an empty path",
                self.class_name
            )));
        }
        if !self.tcc.is_finite() || !(0.0..=1.0).contains(&self.tcc) {
            bail!(RankError::metrics_report(format!(
                "tcc for {} must be a finite value in [0.0, 1.0], got {}",
                self.class_name, self.tcc
            )));
        }
        Ok(())
    }
}
