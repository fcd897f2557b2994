//! Apply engine for desourcify scans.
//!
//! Responsibilities:
//! - Check the source manifest still matches what the scan saw (sha256).
//! - Per selected checkout: install binaries, drop the manifest entry, delete sources.
//! - Hand the removed package names to the build tool's clean step.
//! - Generate a unified diff preview of the manifest.

pub mod error;
pub mod manifest;

pub use error::{EditError, EditResult, PolicyBlockError};
pub use manifest::{
    ManifestEntry, ManifestFormat, SourceManifest, discover_manifest, find_manifest_key,
    manifest_key, sha256_hex,
};

use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use chrono::Utc;
use desourcify_types::apply::{ApplyReport, ApplyStatus, CheckoutApplyResult};
use desourcify_types::scan::{CheckoutDecision, ManifestRef, ScanReport};
use desourcify_types::tool::ToolInfo;
use diffy::PatchFormatter;
use fs_err as fs;
use manifest::abs_path;
use std::collections::BTreeSet;
use std::io;
use tracing::{debug, info, warn};

/// Installs binary packages.
pub trait Installer {
    /// Install `names`, reporting per-name success. An `Err` means the
    /// installer could not run at all.
    fn install_packages(&self, names: &[String]) -> anyhow::Result<Vec<InstallOutcome>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub ok: bool,
    pub message: Option<String>,
}

impl InstallOutcome {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            message: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            message: Some(message.into()),
        }
    }
}

/// Removes build artifacts of packages whose sources are gone.
pub trait WorkspaceCleaner {
    fn clean_packages(&self, names: &[String]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
}

/// Fingerprint a manifest for the scan report.
pub fn manifest_ref(workspace_root: &Utf8Path, path: &Utf8Path) -> anyhow::Result<ManifestRef> {
    let abs = abs_path(workspace_root, path);
    let bytes = fs::read(&abs).with_context(|| format!("read {}", abs))?;
    Ok(ManifestRef {
        path: path.to_path_buf(),
        sha256: sha256_hex(&bytes),
    })
}

/// Replace the selected checkouts with their binary packages.
///
/// Only checkouts the scan classified as fully replaceable are acted on.
/// A checkout whose binaries fail to install keeps its sources and its
/// manifest entry. When `opts.dry_run` is set nothing is installed, written
/// or deleted, but results and the manifest patch are still produced.
pub fn apply_decisions(
    report: &ScanReport,
    selection: &[Utf8PathBuf],
    installer: &dyn Installer,
    cleaner: Option<&dyn WorkspaceCleaner>,
    tool: ToolInfo,
    opts: &ApplyOptions,
) -> EditResult<(ApplyReport, String)> {
    let root = report.workspace_root.as_path();
    let mut apply = ApplyReport::new(tool, report.scan_id.clone(), opts.dry_run);
    apply.started_at = Some(Utc::now());

    let (mut manifest, before) = match &report.manifest {
        Some(mref) => {
            let (m, raw) = check_manifest(root, mref)?;
            (Some(m), raw)
        }
        None => (None, String::new()),
    };

    let selected: BTreeSet<&Utf8PathBuf> = selection.iter().collect();
    let mut removed_packages: Vec<String> = Vec::new();

    for path in selected {
        let result = match report.find(path) {
            None => CheckoutApplyResult::new(path.clone(), ApplyStatus::Skipped)
                .with_message("not part of the scan"),
            Some(decision) if !decision.is_fully_replaceable() => {
                CheckoutApplyResult::new(path.clone(), ApplyStatus::Skipped)
                    .with_message(format!("skipped: {}", decision.decision.as_str()))
            }
            Some(decision) => {
                let result =
                    reconcile_checkout(root, decision, manifest.as_mut(), installer, report, opts);
                if result.status == ApplyStatus::Reconciled
                    || (opts.dry_run && result.status == ApplyStatus::Skipped)
                {
                    removed_packages.extend(decision.package_names());
                }
                result
            }
        };

        debug!(path = %result.path, status = ?result.status, "checkout processed");
        apply.push(result);
    }

    removed_packages.sort();
    removed_packages.dedup();

    if !opts.dry_run && !removed_packages.is_empty() {
        if let Some(cleaner) = cleaner {
            info!("cleaning {} package(s)", removed_packages.len());
            if let Err(e) = cleaner.clean_packages(&removed_packages) {
                warn!("clean step failed: {e:#}");
                apply.clean_error = Some(format!("{e:#}"));
            }
        }
    }
    apply.cleaned_packages = removed_packages;

    let manifest_changed = apply.results.iter().any(|r| r.manifest_entry_removed);
    let patch = match (&manifest, &report.manifest) {
        (Some(m), Some(mref)) if manifest_changed => {
            render_patch(&mref.path, &before, &m.to_yaml()?)
        }
        _ => String::new(),
    };

    apply.ended_at = Some(Utc::now());
    Ok((apply, patch))
}

fn check_manifest(root: &Utf8Path, mref: &ManifestRef) -> EditResult<(SourceManifest, String)> {
    let abs = abs_path(root, &mref.path);
    let raw = match fs::read_to_string(&abs) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PolicyBlockError::ManifestChanged {
                message: format!("{} no longer exists", mref.path),
            }
            .into());
        }
        Err(e) => return Err(anyhow::Error::from(e).into()),
    };

    let actual = sha256_hex(raw.as_bytes());
    if actual != mref.sha256 {
        return Err(PolicyBlockError::ManifestChanged {
            message: format!(
                "{}: expected sha256 {}, got {}",
                mref.path, mref.sha256, actual
            ),
        }
        .into());
    }

    let manifest = SourceManifest::parse(abs.clone(), &raw)
        .with_context(|| format!("parse {}", abs))?;
    Ok((manifest, raw))
}

fn reconcile_checkout(
    root: &Utf8Path,
    decision: &CheckoutDecision,
    manifest: Option<&mut SourceManifest>,
    installer: &dyn Installer,
    report: &ScanReport,
    opts: &ApplyOptions,
) -> CheckoutApplyResult {
    let path = &decision.path;
    let mut result = CheckoutApplyResult::new(path.clone(), ApplyStatus::Failed);

    if !is_contained(path) {
        return result.with_message(format!("refusing to touch {path}: outside the workspace"));
    }

    let to_install = if report.binaries_checked {
        decision.binaries_to_install()
    } else {
        vec![]
    };

    if opts.dry_run {
        if let Some(m) = manifest {
            match find_manifest_key(root, m, &report.src_dir, path) {
                Some(key) => result.manifest_entry_removed = m.remove(&key),
                None => warn!("no entry for {} in {}", path, m.path()),
            }
        }
        result.status = ApplyStatus::Skipped;
        result.installed = to_install;
        return result.with_message("dry-run: not applied");
    }

    if !to_install.is_empty() {
        info!("installing {} for {}", to_install.join(" "), path);
        match installer.install_packages(&to_install) {
            Err(e) => {
                result.failed_installs = to_install;
                return result.with_message(format!("install failed: {e:#}"));
            }
            Ok(outcomes) => {
                for name in &to_install {
                    match outcomes.iter().find(|o| &o.name == name) {
                        Some(o) if o.ok => result.installed.push(name.clone()),
                        _ => result.failed_installs.push(name.clone()),
                    }
                }
                if !result.failed_installs.is_empty() {
                    let msg = format!(
                        "could not install {}; sources left in place",
                        result.failed_installs.join(", ")
                    );
                    return result.with_message(msg);
                }
            }
        }
    }

    let mut unlisted = None;
    if let Some(m) = manifest {
        match find_manifest_key(root, m, &report.src_dir, path) {
            Some(key) => {
                let snapshot = m.clone();
                if m.remove(&key) {
                    if let Err(e) = m.save() {
                        // The file on disk still lists the entry.
                        *m = snapshot;
                        return result.with_message(format!(
                            "binaries installed but manifest update failed: {e:#}"
                        ));
                    }
                    result.manifest_entry_removed = true;
                }
            }
            None => {
                let msg = format!("no entry for {} in {}", path, m.path());
                warn!("{msg}");
                unlisted = Some(msg);
            }
        }
    }

    let abs = root.join(path);
    match fs::remove_dir_all(&abs) {
        Ok(()) => result.sources_deleted = true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return result.with_message(format!("could not delete sources: {e}"));
        }
    }

    result.status = ApplyStatus::Reconciled;
    match unlisted {
        Some(msg) => result.with_message(msg),
        None => result,
    }
}

/// Workspace-relative with no `..` components.
fn is_contained(path: &Utf8Path) -> bool {
    !path.as_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
}

pub fn render_patch(path: &Utf8Path, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    let formatter = PatchFormatter::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    out.push_str(&formatter.fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contained_paths() {
        assert!(is_contained(Utf8Path::new("src/repo")));
        assert!(is_contained(Utf8Path::new("./src/repo")));
        assert!(!is_contained(Utf8Path::new("src/../../etc")));
        assert!(!is_contained(Utf8Path::new("/etc")));
        assert!(!is_contained(Utf8Path::new("")));
    }

    #[test]
    fn patch_is_empty_when_unchanged() {
        assert_eq!(render_patch(Utf8Path::new("a"), "x\n", "x\n"), "");
    }

    #[test]
    fn patch_has_git_headers() {
        let p = render_patch(Utf8Path::new("src/.rosinstall"), "a\nb\n", "a\n");
        assert!(p.starts_with("diff --git a/src/.rosinstall b/src/.rosinstall\n"));
        assert!(p.contains("-b"));
    }
}
