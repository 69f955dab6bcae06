use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{ErrorCode, RankError};
use crate::models::history::{ChangeHistory, HistoryIndex};

const COMMIT_MARKER: &str = ":::";
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Supplies the change history of every file under a source root.
pub trait HistoryProvider: Sync {
    /// Scan the whole history once. Ranking never sees partial history, so any
    /// failure here is terminal for the run.
    fn collect(&self, source_root: &Utf8Path) -> Result<HistoryIndex>;
}

impl HistoryProvider for HistoryIndex {
    fn collect(&self, _source_root: &Utf8Path) -> Result<HistoryIndex> {
        Ok(self.clone())
    }
}

/// `[history]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Upper bound for each git invocation
    pub timeout_secs: u64,
    /// Only read this many of the most recent commits
    pub max_commits: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_commits: None,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!(RankError::invalid_config("history.timeout_secs must be at least 1"));
        }
        if self.max_commits == Some(0) {
            bail!(RankError::invalid_config("history.max_commits must be at least 1"));
        }
        Ok(())
    }
}

/// Reads change history with a single `git log` over the whole repository.
#[derive(Debug, Clone, Default)]
pub struct GitHistoryProvider {
    config: HistoryConfig,
}

impl GitHistoryProvider {
    pub fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    /// Fail unless `source_root` is the top level of a git work tree.
    pub fn ensure_repository_root(&self, source_root: &Utf8Path) -> Result<()> {
        let result = self.run_git(source_root, "rev-parse", &["rev-parse", "--show-toplevel"]);
        let toplevel = match result {
            Ok(out) => out,
            Err(e) if is_code(&e, ErrorCode::GitTimeout) => return Err(e),
            Err(e) => bail!(RankError::new(
                ErrorCode::NotRepositoryRoot,
                format!("{source_root} is not inside a git repository: {e}"),
            )),
        };

        let toplevel = canonical(toplevel.trim());
        let root = canonical(source_root.as_str());
        if toplevel != root {
            bail!(RankError::new(
                ErrorCode::NotRepositoryRoot,
                format!(
                    "{source_root} is not the repository root (git root is {})",
                    toplevel.display()
                ),
            ));
        }
        Ok(())
    }

    /// `git --version` output, e.g. "git version 2.43.0".
    pub fn git_version(&self) -> Result<String> {
        let out = self.run_git(Utf8Path::new("."), "--version", &["--version"])?;
        Ok(out.trim().to_string())
    }

    fn log_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-c",
            "core.quotepath=false",
            "log",
            "--no-renames",
            "--name-only",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!("--format={COMMIT_MARKER}%H{COMMIT_MARKER}%ct"));
        if let Some(n) = self.config.max_commits {
            args.push("-n".to_string());
            args.push(n.to_string());
        }
        args
    }

    /// False for a freshly initialized repository that has no commit yet.
    pub fn has_commits(&self, source_root: &Utf8Path) -> Result<bool> {
        let output = self.spawn_git(
            source_root,
            "rev-parse",
            &["rev-parse", "--verify", "-q", "HEAD"],
        )?;
        Ok(output.status.success())
    }

    /// Run git in `dir` and fail unless it exits successfully.
    fn run_git(&self, dir: &Utf8Path, what: &str, args: &[&str]) -> Result<String> {
        let output = self.spawn_git(dir, what, args)?;
        if !output.status.success() {
            bail!(RankError::history(format!(
                "git {what} failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Run git in `dir`, killing it if it outlives the configured timeout.
    fn spawn_git(&self, dir: &Utf8Path, what: &str, args: &[&str]) -> Result<GitOutput> {
        let mut child = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RankError::history(format!("Failed to run git: {e}")))?;

        // Drain both pipes while waiting so a large log cannot block the child
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let status = wait_with_deadline(&mut child, timeout, what)?;

        Ok(GitOutput {
            status,
            stdout: join_reader(stdout)?,
            stderr: join_reader(stderr)?,
        })
    }
}

struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Poll `child` until it exits; past `timeout` it is killed and `GIT_TIMEOUT` returned.
fn wait_with_deadline(child: &mut Child, timeout: Duration, what: &str) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(status) => return Ok(status),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                bail!(RankError::new(
                    ErrorCode::GitTimeout,
                    format!("git {what} did not finish within {timeout:?}"),
                ));
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

impl HistoryProvider for GitHistoryProvider {
    fn collect(&self, source_root: &Utf8Path) -> Result<HistoryIndex> {
        debug!(
            source_root = %source_root,
            max_commits = ?self.config.max_commits,
            "collect history called"
        );
        self.ensure_repository_root(source_root)?;
        if !self.has_commits(source_root)? {
            warn!(source_root = %source_root, "repository has no commits yet");
            return Ok(HistoryIndex::new());
        }

        let args = self.log_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let raw = self.run_git(source_root, "log", &args)?;
        let index = parse_log(&raw)?;
        debug!(files = index.len(), "collect history completed");
        Ok(index)
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    commits: u32,
    first: i64,
    last: i64,
}

/// Fold `git log --name-only --format=:::%H:::%ct` output into per-file histories.
pub fn parse_log(raw: &str) -> Result<HistoryIndex> {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    let mut current: Option<i64> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix(COMMIT_MARKER) {
            current = Some(parse_header(header)?);
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        let Some(timestamp) = current else {
            bail!(RankError::history(format!(
                "unexpected git log line before any commit header: {trimmed}"
            )));
        };
        tallies
            .entry(trimmed)
            .and_modify(|t| {
                t.commits += 1;
                t.first = t.first.min(timestamp);
                t.last = t.last.max(timestamp);
            })
            .or_insert(Tally {
                commits: 1,
                first: timestamp,
                last: timestamp,
            });
    }

    let mut index = HistoryIndex::new();
    for (path, tally) in tallies {
        index.insert(ChangeHistory::new(
            path,
            tally.commits,
            to_datetime(tally.first)?,
            to_datetime(tally.last)?,
        )?);
    }
    Ok(index)
}

/// `<hash>:::<unix seconds>`
fn parse_header(header: &str) -> Result<i64> {
    let (hash, timestamp) = header.split_once(COMMIT_MARKER).ok_or_else(|| {
        RankError::history(format!("malformed git log commit header: {header}"))
    })?;
    timestamp.trim().parse::<i64>().map_err(|e| {
        RankError::history(format!("bad commit time for {hash}: {e}")).into()
    })
}

fn to_datetime(secs: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| RankError::history(format!("commit time {secs} out of range: {e}")).into())
}

fn canonical(path: &str) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
}

fn is_code(err: &anyhow::Error, code: ErrorCode) -> bool {
    err.downcast_ref::<RankError>().is_some_and(|e| e.code == code)
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| anyhow!("git output reader panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn git(dir: &std::path::Path, args: &[&str], date: &str) {
        let output = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?} failed: {output:?}");
    }

    fn commit(dir: &std::path::Path, file: &str, content: &str, date: &str) {
        let path = dir.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        git(dir, &["add", "."], date);
        git(dir, &["commit", "-q", "-m", content], date);
    }

    #[test]
    fn test_parse_log_folds_commits_per_file() {
        let raw = "\
:::c3:::300

src/A.java
src/B.java
:::c2:::200

src/A.java
:::c1:::100

src/A.java
";
        let index = parse_log(raw).unwrap();
        assert_eq!(index.len(), 2);

        let a = index.history(Utf8Path::new("src/A.java")).unwrap();
        assert_eq!(a.commit_count(), 3);
        assert_eq!(a.first_commit_time().unix_timestamp(), 100);
        assert_eq!(a.most_recent_commit_time().unix_timestamp(), 300);

        let b = index.history(Utf8Path::new("src/B.java")).unwrap();
        assert_eq!(b.commit_count(), 1);
        assert_eq!(b.first_commit_time(), b.most_recent_commit_time());
    }

    #[test]
    fn test_parse_log_skips_commits_without_files() {
        let raw = ":::merge:::500\n:::c1:::100\n\nA.java\n";
        let index = parse_log(raw).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index
                .history(Utf8Path::new("A.java"))
                .unwrap()
                .commit_count(),
            1
        );
    }

    #[test]
    fn test_parse_log_empty_output() {
        assert!(parse_log("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_log_rejects_malformed_header() {
        let err = parse_log(":::nohash\nA.java\n").unwrap_err();
        assert!(is_code(&err, ErrorCode::HistoryError));
        assert!(parse_log(":::abc:::soon\nA.java\n").is_err());
    }

    #[test]
    fn test_parse_log_rejects_orphan_file_line() {
        assert!(parse_log("A.java\n").is_err());
    }

    #[test]
    fn test_log_args_respect_max_commits() {
        let provider = GitHistoryProvider::new(HistoryConfig {
            max_commits: Some(50),
            ..HistoryConfig::default()
        });
        let args = provider.log_args();
        assert!(args.windows(2).any(|w| w[0] == "-n" && w[1] == "50"));
        assert!(args.contains(&"--no-renames".to_string()));
        assert!(!GitHistoryProvider::default().log_args().contains(&"-n".to_string()));
    }

    #[test]
    fn test_config_validation() {
        assert!(HistoryConfig::default().validate().is_ok());
        let zero_timeout = HistoryConfig {
            timeout_secs: 0,
            ..HistoryConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
        let zero_commits = HistoryConfig {
            max_commits: Some(0),
            ..HistoryConfig::default()
        };
        assert!(zero_commits.validate().is_err());
    }

    #[test]
    fn test_collect_from_real_repository() {
        if !git_available() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"], "2024-01-01T00:00:00Z");
        commit(dir.path(), "src/A.java", "one", "2024-01-01T00:00:00Z");
        commit(dir.path(), "src/A.java", "two", "2024-01-05T00:00:00Z");
        commit(dir.path(), "src/B.java", "three", "2024-01-10T00:00:00Z");

        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let index = GitHistoryProvider::default().collect(&root).unwrap();

        let a = index.history(Utf8Path::new("src/A.java")).unwrap();
        assert_eq!(a.commit_count(), 2);
        assert_eq!(a.first_commit_time().unix_timestamp(), 1_704_067_200);
        assert_eq!(a.most_recent_commit_time().unix_timestamp(), 1_704_412_800);
        assert_eq!(
            index
                .history(Utf8Path::new("src/B.java"))
                .unwrap()
                .commit_count(),
            1
        );
    }

    #[test]
    fn test_collect_without_commits_is_empty() {
        if !git_available() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"], "2024-01-01T00:00:00Z");
        fs::write(dir.path().join("A.java"), "class A {}").unwrap();

        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let provider = GitHistoryProvider::default();
        assert!(!provider.has_commits(&root).unwrap());
        let index = provider.collect(&root).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_wait_with_deadline_kills_slow_child() {
        let Ok(mut child) = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            return;
        };

        let started = Instant::now();
        let err = wait_with_deadline(&mut child, Duration::from_millis(200), "log").unwrap_err();
        assert!(is_code(&err, ErrorCode::GitTimeout));
        assert!(err.to_string().contains("git log did not finish within 200ms"));
        assert!(started.elapsed() < Duration::from_secs(3));
        // Reaped by the kill path
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_wait_with_deadline_returns_exit_status() {
        let Ok(mut child) = Command::new("git").arg("--version").stdout(Stdio::null()).spawn()
        else {
            return;
        };
        let status = wait_with_deadline(&mut child, Duration::from_secs(30), "--version").unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_subdirectory_is_not_repository_root() {
        if !git_available() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"], "2024-01-01T00:00:00Z");
        commit(dir.path(), "module/A.java", "one", "2024-01-01T00:00:00Z");

        let sub = camino::Utf8PathBuf::from_path_buf(dir.path().join("module")).unwrap();
        let err = GitHistoryProvider::default().collect(&sub).unwrap_err();
        assert!(is_code(&err, ErrorCode::NotRepositoryRoot));
    }

    #[test]
    fn test_plain_directory_is_not_repository_root() {
        if !git_available() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let err = GitHistoryProvider::default()
            .ensure_repository_root(&root)
            .unwrap_err();
        assert!(is_code(&err, ErrorCode::NotRepositoryRoot));
    }
}
