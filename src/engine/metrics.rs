use std::fs;

use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RankError;
use crate::models::history::normalize_path;
use crate::models::metrics::ClassMetrics;

/// Supplies per-class structural metrics for a source root.
pub trait MetricsProvider: Sync {
    /// Run a fresh scan; results are never reused between runs.
    fn extract(&self, source_root: &Utf8Path) -> Result<Vec<ClassMetrics>>;
}

impl MetricsProvider for Vec<ClassMetrics> {
    fn extract(&self, _source_root: &Utf8Path) -> Result<Vec<ClassMetrics>> {
        Ok(self.clone())
    }
}

/// `[metrics]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Glob (relative to the source root) matching class-metrics reports
    pub report_glob: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_glob: "**/class-metrics.{json,ndjson,jsonl,yaml,yml}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// A JSON array of records
    Json,
    /// One JSON record per line
    Ndjson,
    /// A YAML sequence of records
    Yaml,
}

impl ReportFormat {
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        match path.extension() {
            Some("json") => Ok(Self::Json),
            Some("ndjson" | "jsonl") => Ok(Self::Ndjson),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            other => bail!(RankError::metrics_report(format!(
                "Unsupported metrics report extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Reads class metrics that an external static analyser already wrote to disk.
#[derive(Debug, Clone, Default)]
pub struct ReportMetricsProvider {
    report: Option<Utf8PathBuf>,
    config: MetricsConfig,
}

impl ReportMetricsProvider {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            report: None,
            config,
        }
    }

    /// Read exactly this report instead of searching the source root.
    pub fn with_report(mut self, report: impl Into<Utf8PathBuf>) -> Self {
        self.report = Some(report.into());
        self
    }

    /// Find reports under `source_root`. Build output is usually gitignored,
    /// so ignore files are not honored; hidden directories are still skipped.
    pub fn discover(&self, source_root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        use ignore::WalkBuilder;
        use ignore::overrides::OverrideBuilder;

        let mut overrides = OverrideBuilder::new(source_root);
        overrides.add(&self.config.report_glob).map_err(|e| {
            RankError::invalid_config(format!(
                "Invalid metrics.report_glob {:?}: {e}",
                self.config.report_glob
            ))
        })?;

        let mut builder = WalkBuilder::new(source_root);
        builder
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .overrides(overrides.build()?);

        let mut reports = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => reports.push(path),
                Err(path) => warn!(path = %path.display(), "skipping non UTF-8 report path"),
            }
        }
        reports.sort();
        Ok(reports)
    }
}

impl MetricsProvider for ReportMetricsProvider {
    fn extract(&self, source_root: &Utf8Path) -> Result<Vec<ClassMetrics>> {
        debug!(source_root = %source_root, report = ?self.report, "extract metrics called");
        let reports = match &self.report {
            Some(report) => vec![report.clone()],
            None => self.discover(source_root)?,
        };
        if reports.is_empty() {
            bail!(RankError::metrics_report(format!(
                "No class metrics report matching {} under {source_root}",
                self.config.report_glob
            )));
        }

        let loaded: Vec<Result<Vec<ClassMetrics>>> = reports
            .par_iter()
            .map(|report| load_report(report, source_root))
            .collect();

        let mut classes = Vec::new();
        for result in loaded {
            classes.extend(result?);
        }
        debug!(
            reports = reports.len(),
            classes = classes.len(),
            "extract metrics completed"
        );
        Ok(classes)
    }
}

/// Load, normalize and validate every record of one report file.
pub fn load_report(report: &Utf8Path, source_root: &Utf8Path) -> Result<Vec<ClassMetrics>> {
    let format = ReportFormat::from_path(report)?;
    let content = fs::read_to_string(report).map_err(|e| {
        RankError::metrics_report(format!("Failed to read metrics report {report}: {e}"))
    })?;
    let records = parse_report(&content, format).map_err(|e| {
        RankError::metrics_report(format!("Failed to parse metrics report {report}: {e}"))
    })?;

    records
        .into_iter()
        .enumerate()
        .map(|(i, mut class)| {
            class.path = relativize(&class.path, source_root).map_err(|e| {
                RankError::metrics_report(format!("{report} record {}: {e}", i + 1))
            })?;
            class.validate().map_err(|e| {
                RankError::metrics_report(format!("{report} record {}: {e}", i + 1))
            })?;
            Ok(class)
        })
        .collect()
}

pub fn parse_report(content: &str, format: ReportFormat) -> Result<Vec<ClassMetrics>> {
    match format {
        ReportFormat::Json => Ok(serde_json::from_str(content)?),
        ReportFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            Ok(serde_yaml::from_str(content)?)
        }
        ReportFormat::Ndjson => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| anyhow::anyhow!("line {}: {e}", n + 1))
            })
            .collect(),
    }
}

/// Make a record path repository-relative; absolute paths must lie under the root.
fn relativize(path: &Utf8Path, source_root: &Utf8Path) -> Result<Utf8PathBuf> {
    if !path.is_absolute() {
        return Ok(normalize_path(path.as_str()));
    }
    if let Ok(rest) = path.strip_prefix(source_root) {
        return Ok(normalize_path(rest.as_str()));
    }
    let canonical_root = source_root
        .canonicalize_utf8()
        .unwrap_or_else(|_| source_root.to_path_buf());
    match path.strip_prefix(&canonical_root) {
        Ok(rest) => Ok(normalize_path(rest.as_str())),
        Err(_) => bail!("path {path} is outside the source root {source_root}"),
    }
}
