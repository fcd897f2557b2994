use crate::ports::VcsPort;
use crate::shell::capture;
use anyhow::Context;
use camino::Utf8Path;
use desourcify_types::checkout::{CleanState, RemoteState};

/// `VcsPort` driving the `git` command line client.
#[derive(Debug, Clone)]
pub struct GitCliVcs {
    program: String,
}

impl Default for GitCliVcs {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCliVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn git(&self, repo: &Utf8Path, args: &[&str]) -> anyhow::Result<String> {
        let out = capture(&self.program, args, Some(repo))?;
        let stdout = out.into_stdout(&format!("git {}", args.join(" ")))?;
        Ok(stdout.trim().to_string())
    }

    fn current_branch(&self, repo: &Utf8Path) -> anyhow::Result<Option<String>> {
        let out = capture(&self.program, &["symbolic-ref", "-q", "--short", "HEAD"], Some(repo))?;
        Ok(out.success().then(|| out.stdout.trim().to_string()))
    }
}

impl VcsPort for GitCliVcs {
    fn is_checkout_clean(&self, path: &Utf8Path) -> anyhow::Result<CleanState> {
        if self.current_branch(path)?.is_none() {
            return Ok(CleanState::Dirty("HEAD is detached".to_string()));
        }

        if !self.git(path, &["status", "--porcelain"])?.is_empty() {
            return Ok(CleanState::Dirty(
                "it is dirty or contains untracked files".to_string(),
            ));
        }

        if !self.git(path, &["stash", "list"])?.is_empty() {
            return Ok(CleanState::Dirty("it has stashed changes".to_string()));
        }

        let branches = self.git(
            path,
            &[
                "for-each-ref",
                "--format=%(refname:short)%09%(upstream:short)%09%(upstream:track)",
                "refs/heads",
            ],
        )?;
        for line in branches.lines() {
            if let Some(reason) = branch_problem(line) {
                return Ok(CleanState::Dirty(reason));
            }
        }

        Ok(CleanState::Clean)
    }

    fn resolve_remote(&self, path: &Utf8Path) -> anyhow::Result<RemoteState> {
        let branch = self
            .current_branch(path)?
            .context("HEAD is detached")?;
        let commit = self.git(path, &["rev-parse", "HEAD"])?;

        let key = format!("branch.{branch}.remote");
        let remote = capture(&self.program, &["config", "--get", &key], Some(path))?;
        let remote = if remote.success() && !remote.stdout.trim().is_empty() {
            remote.stdout.trim().to_string()
        } else {
            "origin".to_string()
        };
        let url = self
            .git(path, &["remote", "get-url", &remote])
            .with_context(|| format!("resolve url of remote {remote}"))?;

        Ok(RemoteState {
            url,
            branch,
            commit,
        })
    }
}

/// One `for-each-ref` line: `<branch>\t<upstream>\t<track>`.
fn branch_problem(line: &str) -> Option<String> {
    let mut parts = line.split('\t');
    let branch = parts.next()?.trim();
    if branch.is_empty() {
        return None;
    }
    let upstream = parts.next().unwrap_or_default().trim();
    let track = parts.next().unwrap_or_default().trim();

    if upstream.is_empty() {
        Some(format!("branch {branch} has no upstream configured"))
    } else if track.contains("gone") {
        Some(format!("the upstream of branch {branch} is gone"))
    } else if track.contains("ahead") {
        Some(format!("branch {branch} has unpushed commits"))
    } else {
        None
    }
}
