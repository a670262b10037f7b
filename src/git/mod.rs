//! Git source fetching for keel.
//!
//! Template versions point at remote git repositories; this module
//! materializes their source trees into the local clone cache. Three fetch
//! modes cover the catalogued pinning styles:
//!
//! - [`clone_head`](SourceFetcher::clone_head): shallow clone of the default
//!   branch (`--depth 1 --single-branch --no-tags --no-recurse-submodules`)
//! - [`clone_tag`](SourceFetcher::clone_tag): the same shallow clone pinned
//!   with `--branch <tag>`
//! - [`clone_commit`](SourceFetcher::clone_commit): init, remote add, fetch
//!   `--depth 1` of one commit, checkout `FETCH_HEAD`
//!
//! Success is defined by the destination directory existing after the
//! sequence (plus a zero checkout exit for commit pinning). A clone into an
//! already-populated cache directory makes git exit non-zero; that exit is
//! logged and the populated directory is accepted, which is what turns the
//! destination layout into a cache.
//!
//! Concurrent fetches of the same destination serialize on a per-path async
//! mutex, so two validations referencing the same template version never
//! interleave git processes in one directory.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::{GIT_CLONE_TIMEOUT, GIT_FETCH_TIMEOUT, GIT_LOCAL_TIMEOUT};
use crate::core::{KeelError, VersionSource};
use crate::process::{CommandRunner, ExecSpec};

/// Fetches template sources into local cache directories.
pub struct SourceFetcher {
    runner: Arc<dyn CommandRunner>,
    git: String,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl SourceFetcher {
    /// New fetcher driving `git` through the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>, git: impl Into<String>) -> Self {
        Self {
            runner,
            git: git.into(),
            locks: DashMap::new(),
        }
    }

    /// Fetch a version source: tag-pinned when the source carries a tag,
    /// otherwise a shallow clone of the default branch head.
    ///
    /// # Errors
    ///
    /// See [`clone_head`](Self::clone_head) and
    /// [`clone_tag`](Self::clone_tag).
    pub async fn fetch(
        &self,
        source: &VersionSource,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), KeelError> {
        match &source.tag {
            Some(tag) => self.clone_tag(&source.repository, tag, dest, cancel).await,
            None => self.clone_head(&source.repository, dest, cancel).await,
        }
    }

    /// Shallow clone of the repository's default branch head into `dest`.
    ///
    /// # Errors
    ///
    /// [`KeelError::GitCloneFailed`] when the destination does not exist
    /// afterwards; runner faults (missing git, timeout, cancellation)
    /// propagate unchanged.
    pub async fn clone_head(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), KeelError> {
        let lock = self.lock_for(dest);
        let _guard = lock.lock().await;

        debug!(target: "git", "Cloning {url} into {}", dest.display());
        let spec = ExecSpec::new(&self.git)
            .args([
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--no-tags",
                "--no-recurse-submodules",
                url,
                &dest.display().to_string(),
            ])
            .timeout(GIT_CLONE_TIMEOUT);
        let output = self.runner.run(spec, cancel).await?;

        accept_clone(url, dest, output.exit_code, &output.stderr)
    }

    /// Shallow clone pinned to a tag.
    ///
    /// # Errors
    ///
    /// Same contract as [`clone_head`](Self::clone_head).
    pub async fn clone_tag(
        &self,
        url: &str,
        tag: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), KeelError> {
        let lock = self.lock_for(dest);
        let _guard = lock.lock().await;

        debug!(target: "git", "Cloning {url} at tag {tag} into {}", dest.display());
        let spec = ExecSpec::new(&self.git)
            .args([
                "clone",
                "--branch",
                tag,
                "--depth",
                "1",
                "--single-branch",
                "--no-tags",
                "--no-recurse-submodules",
                url,
                &dest.display().to_string(),
            ])
            .timeout(GIT_CLONE_TIMEOUT);
        let output = self.runner.run(spec, cancel).await?;

        accept_clone(url, dest, output.exit_code, &output.stderr)
    }

    /// Fetch exactly one commit: init a repository in `dest`, add the
    /// remote, fetch the commit at depth 1, and checkout `FETCH_HEAD`.
    ///
    /// Intermediate non-zero exits (an already-initialized repository, an
    /// already-registered remote) are logged and tolerated; only the final
    /// checkout decides the outcome.
    ///
    /// # Errors
    ///
    /// [`KeelError::GitCheckoutFailed`] when the checkout exits non-zero,
    /// runner faults otherwise.
    pub async fn clone_commit(
        &self,
        url: &str,
        commit: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), KeelError> {
        let lock = self.lock_for(dest);
        let _guard = lock.lock().await;

        debug!(target: "git", "Fetching commit {commit} of {url} into {}", dest.display());
        tokio::fs::create_dir_all(dest).await?;

        self.run_in(dest, &["init"], GIT_LOCAL_TIMEOUT, cancel).await?;
        self.run_in(dest, &["remote", "add", "origin", url], GIT_LOCAL_TIMEOUT, cancel).await?;
        self.run_in(dest, &["fetch", "--depth", "1", "origin", commit], GIT_FETCH_TIMEOUT, cancel)
            .await?;
        let checkout =
            self.run_in(dest, &["checkout", "FETCH_HEAD"], GIT_LOCAL_TIMEOUT, cancel).await?;

        if checkout == 0 && dest.is_dir() {
            Ok(())
        } else {
            Err(KeelError::GitCheckoutFailed {
                reference: commit.to_string(),
                reason: format!("checkout exited with code {checkout}"),
            })
        }
    }

    /// Run one git subcommand inside `dir`, returning its exit code.
    async fn run_in(
        &self,
        dir: &Path,
        args: &[&str],
        timeout: std::time::Duration,
        cancel: &CancellationToken,
    ) -> Result<i32, KeelError> {
        let spec =
            ExecSpec::new(&self.git).args(args.iter().copied()).current_dir(dir).timeout(timeout);
        let operation = spec.operation();
        let output = self.runner.run(spec, cancel).await?;
        if !output.success() {
            warn!(
                target: "git",
                "git {} in {} exited {}: {}",
                operation,
                dir.display(),
                output.exit_code,
                output.stderr.trim()
            );
        }
        Ok(output.exit_code)
    }

    fn lock_for(&self, dest: &Path) -> Arc<Mutex<()>> {
        self.locks.entry(dest.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

fn accept_clone(url: &str, dest: &Path, exit_code: i32, stderr: &str) -> Result<(), KeelError> {
    if exit_code != 0 {
        warn!(
            target: "git",
            "clone of {url} exited {exit_code}: {}",
            stderr.trim()
        );
    }
    if dest.is_dir() {
        Ok(())
    } else {
        Err(KeelError::GitCloneFailed {
            url: url.to_string(),
            reason: if stderr.trim().is_empty() {
                format!("clone exited with code {exit_code}")
            } else {
                stderr.trim().to_string()
            },
        })
    }
}
