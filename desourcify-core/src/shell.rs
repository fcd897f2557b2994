//! Thin wrappers around `std::process::Command` for the shell adapters.

use anyhow::Context;
use camino::Utf8Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout on success, otherwise an error carrying stderr.
    pub fn into_stdout(self, what: &str) -> anyhow::Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            anyhow::bail!("{} failed ({}): {}", what, self.status, self.stderr.trim())
        }
    }
}

/// Run `program` with captured output and a C locale.
pub(crate) fn capture(program: &str, args: &[&str], cwd: Option<&Utf8Path>) -> anyhow::Result<Captured> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("running {} {}", program, args.join(" "));
    let out = cmd
        .output()
        .with_context(|| format!("spawn {}", program))?;

    Ok(Captured {
        status: out.status,
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    })
}

/// Run `argv` attached to the terminal (sudo may prompt for a password).
pub(crate) fn run_inherited(argv: &[String], cwd: Option<&Utf8Path>) -> anyhow::Result<ExitStatus> {
    let (program, args) = argv.split_first().context("empty command")?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("running {}", argv.join(" "));
    cmd.status().with_context(|| format!("spawn {}", program))
}
