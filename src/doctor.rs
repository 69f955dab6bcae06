use camino::Utf8Path;
use serde::Serialize;

use crate::engine::history::{GitHistoryProvider, HistoryConfig};
use crate::error::RankError;

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub version: String,
    pub git: GitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryStatus>,
}

#[derive(Debug, Serialize)]
pub struct GitStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryStatus {
    pub dir: String,
    pub repository_root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the doctor check: git must be runnable and `dir`, when given, a repository root.
pub fn run_doctor(config: &HistoryConfig, dir: Option<&str>) -> DoctorReport {
    let git = GitHistoryProvider::new(config.clone());

    let version = git.git_version().ok();
    let repository = dir.map(|dir| match git.ensure_repository_root(Utf8Path::new(dir)) {
        Ok(()) => RepositoryStatus {
            dir: dir.to_string(),
            repository_root: true,
            error: None,
        },
        Err(e) => RepositoryStatus {
            dir: dir.to_string(),
            repository_root: false,
            error: Some(match e.downcast_ref::<RankError>() {
                Some(err) => err.message.clone(),
                None => e.to_string(),
            }),
        },
    });

    DoctorReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: GitStatus {
            available: version.is_some(),
            version,
        },
        repository,
    }
}
