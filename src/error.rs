use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidSourceRoot,
    NotRepositoryRoot,
    MetricsReportError,
    HistoryError,
    GitTimeout,
    DuplicateCandidate,
    InvalidConfig,
    IoError,
}

impl ErrorCode {
    /// Errors raised before any ranking happens because the input itself is unusable.
    pub fn is_input_error(self) -> bool {
        matches!(
            self,
            Self::InvalidSourceRoot | Self::NotRepositoryRoot | Self::MetricsReportError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSourceRoot => write!(f, "INVALID_SOURCE_ROOT"),
            Self::NotRepositoryRoot => write!(f, "NOT_REPOSITORY_ROOT"),
            Self::MetricsReportError => write!(f, "METRICS_REPORT_ERROR"),
            Self::HistoryError => write!(f, "HISTORY_ERROR"),
            Self::GitTimeout => write!(f, "GIT_TIMEOUT"),
            Self::DuplicateCandidate => write!(f, "DUPLICATE_CANDIDATE"),
            Self::InvalidConfig => write!(f, "INVALID_CONFIG"),
            Self::IoError => write!(f, "IO_ERROR"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RankError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for RankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RankError {}

impl RankError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_source_root(path: &str) -> Self {
        Self::new(
            ErrorCode::InvalidSourceRoot,
            format!("Source root is not an analyzable directory: {path}"),
        )
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    pub fn metrics_report(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MetricsReportError, message)
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HistoryError, message)
    }
}
