//! File logging with daily rotation in the local time zone.
//!
//! stdout carries the JSON result, so nothing is ever logged there.

use anyhow::{Context, Result};
use logroller::{LogRollerBuilder, Rotation, RotationAge, TimeZone};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use time::macros::format_description;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;

use crate::config::Config;

/// Log files are named `refactor-first.YYYY-MM-DD`.
const LOG_PREFIX: &str = "refactor-first";
const MAX_AGE: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Install the global subscriber writing to `config.log_path`.
pub fn init(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.log_path).with_context(|| {
        format!(
            "Failed to create log directory: {}",
            config.log_path.display()
        )
    })?;

    let removed = cleanup_old_logs(&config.log_path)?;

    let appender = LogRollerBuilder::new(config.log_path.as_path(), Path::new(LOG_PREFIX))
        .rotation(Rotation::AgeBased(RotationAge::Daily))
        .time_zone(TimeZone::Local)
        .max_keep_files(3)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create log roller: {e}"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let time_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = OffsetTime::new(local_offset, time_format);

    // RUST_LOG narrows the output; debug is the floor otherwise
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::DEBUG.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(timer),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {e}"))?;

    // The writer thread must outlive main
    std::mem::forget(guard);

    tracing::debug!(
        log_path = %config.log_path.display(),
        removed_logs = removed,
        version = env!("CARGO_PKG_VERSION"),
        "logging initialized"
    );
    Ok(())
}

/// Remove this tool's log files older than three days. Returns how many were removed.
pub fn cleanup_old_logs(log_path: &Path) -> Result<usize> {
    if !log_path.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now() - MAX_AGE;

    let mut removed = 0;
    for entry in fs::read_dir(log_path)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_log_file(&path) {
            continue;
        }

        if let Ok(metadata) = entry.metadata()
            && let Ok(modified) = metadata.modified()
            && modified < cutoff
            && fs::remove_file(&path).is_ok()
        {
            removed += 1;
        }
    }

    Ok(removed)
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_PREFIX))
}
