//! Core scan and apply pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: version control, the package index,
//! installs and the clean step all go through the port traits.

use crate::ports::{Installer, PackageIndex, VcsPort, WorkspaceCleaner, WritePort};
use crate::settings::{ApplySettings, ScanSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use desourcify_domain::{FsWorkspaceView, Reconciler, ReconcilerConfig, ScanError};
use desourcify_edit::{ApplyOptions, EditError, apply_decisions, discover_manifest, manifest_ref};
use desourcify_render::{render_apply_md, render_scan_md};
use desourcify_types::apply::ApplyReport;
use desourcify_types::scan::ScanReport;
use desourcify_types::tool::ToolInfo;
use tracing::{debug, info};
use uuid::Uuid;

/// Error type for pipeline results. Exit code 2 = policy block, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("policy block: {0}")]
    PolicyBlock(String),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::PolicyBlock(_) => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

impl From<ScanError> for ToolError {
    fn from(err: ScanError) -> Self {
        ToolError::Internal(anyhow::Error::new(err))
    }
}

impl From<EditError> for ToolError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::PolicyBlock(block) => ToolError::PolicyBlock(block.to_string()),
            EditError::Runtime(e) => ToolError::Internal(e),
        }
    }
}

/// Scan the workspace and fingerprint its source manifest.
pub fn run_scan(
    settings: &ScanSettings,
    vcs: &dyn VcsPort,
    index: &dyn PackageIndex,
    tool: ToolInfo,
) -> Result<ScanReport, ToolError> {
    let started = Utc::now();
    let root = settings.workspace_root.clone();

    let config = ReconcilerConfig {
        workspace_root: root.clone(),
        package_name_prefix: settings.package_name_prefix.clone(),
        check_binaries: settings.check_binaries,
    };
    let view = FsWorkspaceView::new(root.clone(), settings.src_dir.clone());
    let reconciler = Reconciler::new(config, vcs, index);

    let mut report = reconciler.scan(&view, tool, Uuid::new_v4().to_string())?;
    report.src_dir = settings.src_dir.clone();

    let manifest = settings
        .manifest
        .clone()
        .or_else(|| discover_manifest(&root, &settings.src_dir));
    match manifest {
        Some(path) => {
            let rel = relative_to_root(&root, &path);
            debug!("using manifest {}", rel);
            report.manifest = Some(manifest_ref(&root, &rel).context("fingerprint manifest")?);
        }
        None => info!("no source manifest found; only sources will be removed"),
    }

    report.started_at = Some(started);
    report.ended_at = Some(Utc::now());
    Ok(report)
}

fn relative_to_root(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Write the scan artifacts (`scan.json`, `scan.md`) to the output directory.
pub fn write_scan_artifacts(
    report: &ScanReport,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let json = serde_json::to_string_pretty(report).context("serialize scan report")?;
    writer.write_file(&out_dir.join("scan.json"), json.as_bytes())?;
    writer.write_file(&out_dir.join("scan.md"), render_scan_md(report).as_bytes())?;
    Ok(())
}

/// Outcome of `run_apply`.
pub struct ApplyOutcome {
    pub apply: ApplyReport,
    pub patch: String,
}

impl ApplyOutcome {
    /// 1 when any checkout failed or the clean step failed, 0 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.apply.has_failures() { 1 } else { 0 }
    }
}

/// Replace the selected checkouts of `report`.
pub fn run_apply(
    settings: &ApplySettings,
    report: &ScanReport,
    selection: &[Utf8PathBuf],
    installer: &dyn Installer,
    cleaner: Option<&dyn WorkspaceCleaner>,
    tool: ToolInfo,
) -> Result<ApplyOutcome, ToolError> {
    let opts = ApplyOptions {
        dry_run: settings.dry_run,
    };
    let (apply, patch) = apply_decisions(report, selection, installer, cleaner, tool, &opts)?;

    info!(
        reconciled = apply.summary.reconciled,
        failed = apply.summary.failed,
        skipped = apply.summary.skipped,
        "apply finished"
    );
    Ok(ApplyOutcome { apply, patch })
}

/// Write the apply artifacts (`apply.json`, `apply.md`, `manifest.diff`).
pub fn write_apply_artifacts(
    outcome: &ApplyOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let json = serde_json::to_string_pretty(&outcome.apply).context("serialize apply report")?;
    writer.write_file(&out_dir.join("apply.json"), json.as_bytes())?;
    writer.write_file(
        &out_dir.join("apply.md"),
        render_apply_md(&outcome.apply).as_bytes(),
    )?;
    writer.write_file(&out_dir.join("manifest.diff"), outcome.patch.as_bytes())?;
    Ok(())
}
