use std::process::Command as GitCommand;
use std::sync::LazyLock;

use regex::Regex;

use crate::diff::ChangeSet;
use crate::error::{AppError, AppResult};

/// Working tree state as reported by `git status --porcelain -z`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    pub staged: Vec<String>,
    pub unstaged: Vec<String>,
    pub untracked: Vec<String>,
}

impl RepoStatus {
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn has_unstaged_work(&self) -> bool {
        !self.unstaged.is_empty() || !self.untracked.is_empty()
    }

    /// Every path that `stage` would need to add.
    pub fn pending_paths(&self) -> Vec<String> {
        let mut paths = self.unstaged.clone();
        for p in &self.untracked {
            if !paths.contains(p) {
                paths.push(p.clone());
            }
        }
        paths
    }

    /// Parse `git status --porcelain -z`: NUL-terminated `XY path` records,
    /// with the original path of a rename or copy as an extra record.
    pub fn from_porcelain(output: &str) -> Self {
        let mut status = RepoStatus::default();
        let mut records = output.split('\0');

        while let Some(record) = records.next() {
            if record.len() < 4 {
                continue;
            }
            let (code, path) = record.split_at(3);
            let path = path.to_string();

            let mut chars = code.chars();
            let index = chars.next().unwrap_or(' ');
            let worktree = chars.next().unwrap_or(' ');

            // The new path is the one to stage; skip the old one.
            if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
                records.next();
            }

            if index == '?' && worktree == '?' {
                status.untracked.push(path);
                continue;
            }
            if index != ' ' {
                status.staged.push(path.clone());
            }
            if worktree != ' ' {
                status.unstaged.push(path);
            }
        }

        status
    }
}

/// The version-control operations a run needs.
pub trait Vcs {
    fn is_repository(&self) -> bool;
    fn status(&self) -> AppResult<RepoStatus>;
    fn staged_change_set(&self) -> AppResult<ChangeSet>;
    fn add(&self, paths: &[String]) -> AppResult<()>;
    fn commit(&self, message: &str) -> AppResult<()>;
    fn amend(&self, message: &str) -> AppResult<()>;
    fn last_message(&self) -> AppResult<String>;
    fn current_branch(&self) -> AppResult<String>;
    /// Repository identifier like "owner/repo", if a remote is configured.
    fn remote_repo_id(&self) -> Option<String>;
}

/// `Vcs` backed by the `git` binary in the current directory.
#[derive(Debug, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        GitCli
    }
}

/// Run a git command and capture stdout as String.
pub fn git_output(args: &[&str]) -> AppResult<String> {
    let output = GitCommand::new("git")
        .args(args)
        .output()
        .map_err(|e| AppError::Vcs(format!("failed to run git {:?}: {e}", args)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Vcs(format!(
            "git {:?} exited with status {:?}: {}",
            args,
            output.status.code(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

impl Vcs for GitCli {
    fn is_repository(&self) -> bool {
        git_output(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    fn status(&self) -> AppResult<RepoStatus> {
        let out = git_output(&["status", "--porcelain", "-z"])?;
        Ok(RepoStatus::from_porcelain(&out))
    }

    fn staged_change_set(&self) -> AppResult<ChangeSet> {
        let numstat = git_output(&["diff", "--cached", "--numstat", "--no-renames", "-z"])?;
        let raw_diff = git_output(&["diff", "--cached"])?;
        Ok(ChangeSet::from_numstat(&numstat, raw_diff))
    }

    fn add(&self, paths: &[String]) -> AppResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        log::info!("Staging {} path(s)", paths.len());
        let mut args = vec!["--literal-pathspecs", "add", "--"];
        args.extend(paths.iter().map(String::as_str));
        git_output(&args)?;
        Ok(())
    }

    fn commit(&self, message: &str) -> AppResult<()> {
        log::info!("Creating commit");
        git_output(&["commit", "-m", message])?;
        Ok(())
    }

    fn amend(&self, message: &str) -> AppResult<()> {
        log::info!("Amending previous commit");
        git_output(&["commit", "--amend", "-m", message])?;
        Ok(())
    }

    fn last_message(&self) -> AppResult<String> {
        let out = git_output(&["log", "-1", "--pretty=%B"])?;
        Ok(out.trim().to_string())
    }

    fn current_branch(&self) -> AppResult<String> {
        let name = git_output(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string();
        Ok(name)
    }

    fn remote_repo_id(&self) -> Option<String> {
        let url = git_output(&["config", "--get", "remote.origin.url"]).ok()?;
        repo_id_from_url(&url)
    }
}

/// Derive "owner/repo" from an SSH or HTTPS remote URL.
pub fn repo_id_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches(".git");

    // For SSH: git@github.com:owner/repo
    // For HTTPS: https://github.com/owner/repo
    let path = if let Some(idx) = trimmed.find("://") {
        let rest = &trimmed[idx + 3..];
        match rest.find('/') {
            Some(slash) => &rest[slash + 1..],
            None => rest,
        }
    } else if let Some(idx) = trimmed.find(':') {
        &trimmed[idx + 1..]
    } else {
        trimmed
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 2 {
        let owner = segments[segments.len() - 2];
        let repo = segments[segments.len() - 1];
        Some(format!("{}/{}", owner, repo))
    } else {
        None
    }
}

static BRANCH_ISSUE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[/_#-])(\d+)(?:[/_-]|$)").expect("issue pattern is valid"));

/// Find the issue number encoded in a branch name, e.g. `feature/123-login`.
pub fn issue_number_from_branch(branch: &str) -> Option<u64> {
    BRANCH_ISSUE_NUMBER
        .captures(branch)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
