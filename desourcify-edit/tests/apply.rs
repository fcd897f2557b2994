//! Apply engine tests against a real workspace tree.

use camino::{Utf8Path, Utf8PathBuf};
use desourcify_edit::{
    ApplyOptions, InstallOutcome, Installer, SourceManifest, WorkspaceCleaner, apply_decisions,
    manifest_ref,
};
use desourcify_types::apply::ApplyStatus;
use desourcify_types::checkout::CleanState;
use desourcify_types::scan::{CheckoutDecision, PackageDecision, Replaceability, ScanReport};
use desourcify_types::tool::ToolInfo;
use fs_err as fs;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use tempfile::TempDir;

const ROSINSTALL: &str = "\
- git:
    local-name: alpha
    uri: https://github.com/org/alpha.git
    version: main
- git:
    local-name: beta
    uri: https://github.com/org/beta.git
    version: main
- git:
    local-name: gamma
    uri: https://github.com/org/gamma.git
    version: main
";

#[derive(Default)]
struct FakeInstaller {
    failing: Vec<String>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl Installer for FakeInstaller {
    fn install_packages(&self, names: &[String]) -> anyhow::Result<Vec<InstallOutcome>> {
        self.calls.borrow_mut().push(names.to_vec());
        Ok(names
            .iter()
            .map(|n| {
                if self.failing.contains(n) {
                    InstallOutcome::failed(n, "unable to locate package")
                } else {
                    InstallOutcome::ok(n)
                }
            })
            .collect())
    }
}

struct BrokenInstaller;

impl Installer for BrokenInstaller {
    fn install_packages(&self, _names: &[String]) -> anyhow::Result<Vec<InstallOutcome>> {
        anyhow::bail!("apt-get not found")
    }
}

#[derive(Default)]
struct FakeCleaner {
    fail: bool,
    calls: RefCell<Vec<Vec<String>>>,
}

impl WorkspaceCleaner for FakeCleaner {
    fn clean_packages(&self, names: &[String]) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(names.to_vec());
        if self.fail {
            anyhow::bail!("catkin clean exited with status 1");
        }
        Ok(())
    }
}

struct Ws {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Ws {
    fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        for name in ["alpha", "beta", "gamma"] {
            let dir = root.join("src").join(name);
            fs::create_dir_all(dir.join(".git")).unwrap();
            fs::write(dir.join("package.xml"), format!("<package><name>{name}</name></package>"))
                .unwrap();
        }
        fs::write(root.join("src/.rosinstall"), ROSINSTALL).unwrap();
        Self { _temp: temp, root }
    }

    fn report(&self) -> ScanReport {
        let mut report = ScanReport::new(
            ToolInfo::new("desourcify", None),
            "scan-1".to_string(),
            self.root.clone(),
        );
        report.manifest =
            Some(manifest_ref(&self.root, Utf8Path::new("src/.rosinstall")).expect("manifest ref"));
        report.checkouts = vec![
            decision("src/alpha", Replaceability::Full, &[("alpha", "ros-noetic-alpha")]),
            decision("src/beta", Replaceability::Full, &[("beta", "ros-noetic-beta")]),
            decision("src/gamma", Replaceability::Partial, &[("gamma", "ros-noetic-gamma")]),
        ];
        report.summarize();
        report
    }

    fn manifest_names(&self) -> Vec<String> {
        SourceManifest::load(&self.root.join("src/.rosinstall"))
            .expect("load")
            .entries()
            .into_iter()
            .map(|e| e.local_name)
            .collect()
    }
}

fn decision(path: &str, decision: Replaceability, pkgs: &[(&str, &str)]) -> CheckoutDecision {
    CheckoutDecision {
        path: Utf8PathBuf::from(path),
        decision,
        clean: CleanState::Clean,
        remote: None,
        packages: pkgs
            .iter()
            .map(|(name, bin)| PackageDecision::matched(*name, Some(bin.to_string()), false))
            .collect(),
    }
}

fn tool() -> ToolInfo {
    ToolInfo::new("desourcify", Some("0.1.0".to_string()))
}

fn paths(items: &[&str]) -> Vec<Utf8PathBuf> {
    items.iter().map(Utf8PathBuf::from).collect()
}

#[test]
fn failed_install_leaves_checkout_untouched() {
    let ws = Ws::new();
    let report = ws.report();
    let installer = FakeInstaller {
        failing: vec!["ros-noetic-beta".to_string()],
        ..Default::default()
    };
    let cleaner = FakeCleaner::default();

    let (apply, patch) = apply_decisions(
        &report,
        &paths(&["src/alpha", "src/beta"]),
        &installer,
        Some(&cleaner),
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.summary.reconciled, 1);
    assert_eq!(apply.summary.failed, 1);
    assert!(apply.has_failures());

    let alpha = &apply.results[0];
    assert_eq!(alpha.status, ApplyStatus::Reconciled);
    assert!(alpha.manifest_entry_removed);
    assert!(alpha.sources_deleted);
    assert_eq!(alpha.installed, vec!["ros-noetic-alpha"]);

    let beta = &apply.results[1];
    assert_eq!(beta.status, ApplyStatus::Failed);
    assert_eq!(beta.failed_installs, vec!["ros-noetic-beta"]);
    assert!(!beta.manifest_entry_removed);

    assert!(!ws.root.join("src/alpha").exists());
    assert!(ws.root.join("src/beta/package.xml").exists());
    assert_eq!(ws.manifest_names(), vec!["beta", "gamma"]);

    assert_eq!(*cleaner.calls.borrow(), vec![vec!["alpha".to_string()]]);
    assert_eq!(apply.cleaned_packages, vec!["alpha"]);
    assert!(patch.contains("-    local-name: alpha"));
}

#[test]
fn rerunning_on_reconciled_workspace_changes_nothing() {
    let ws = Ws::new();
    let installer = FakeInstaller::default();
    let selection = paths(&["src/alpha"]);

    apply_decisions(&ws.report(), &selection, &installer, None, tool(), &ApplyOptions::default())
        .expect("first apply");
    let manifest_after_first = fs::read_to_string(ws.root.join("src/.rosinstall")).unwrap();

    let (second, patch) =
        apply_decisions(&ws.report(), &selection, &installer, None, tool(), &ApplyOptions::default())
            .expect("second apply");

    assert_eq!(second.results[0].status, ApplyStatus::Reconciled);
    assert!(!second.results[0].manifest_entry_removed);
    assert!(!second.results[0].sources_deleted);
    assert_eq!(patch, "");
    assert_eq!(
        fs::read_to_string(ws.root.join("src/.rosinstall")).unwrap(),
        manifest_after_first
    );
}

#[test]
fn changed_manifest_blocks_the_whole_apply() {
    let ws = Ws::new();
    let report = ws.report();
    fs::write(ws.root.join("src/.rosinstall"), format!("{ROSINSTALL}# edited\n")).unwrap();

    let installer = FakeInstaller::default();
    let err = apply_decisions(
        &report,
        &paths(&["src/alpha"]),
        &installer,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect_err("policy block");

    assert!(err.is_policy_block());
    assert_eq!(err.exit_code(), 2);
    assert!(installer.calls.borrow().is_empty());
    assert!(ws.root.join("src/alpha").exists());
}

#[test]
fn dry_run_touches_nothing_but_reports_the_patch() {
    let ws = Ws::new();
    let installer = FakeInstaller::default();
    let cleaner = FakeCleaner::default();

    let (apply, patch) = apply_decisions(
        &ws.report(),
        &paths(&["src/alpha", "src/beta"]),
        &installer,
        Some(&cleaner),
        tool(),
        &ApplyOptions { dry_run: true },
    )
    .expect("dry run");

    assert!(apply.dry_run);
    assert_eq!(apply.summary.skipped, 2);
    assert!(apply
        .results
        .iter()
        .all(|r| r.message.as_deref() == Some("dry-run: not applied")));
    assert!(installer.calls.borrow().is_empty());
    assert!(cleaner.calls.borrow().is_empty());
    assert!(ws.root.join("src/alpha").exists());
    assert_eq!(ws.manifest_names(), vec!["alpha", "beta", "gamma"]);
    assert!(patch.contains("-    local-name: alpha"));
    assert!(patch.contains("-    local-name: beta"));
}

#[test]
fn partial_and_unknown_checkouts_are_skipped() {
    let ws = Ws::new();
    let installer = FakeInstaller::default();

    let (apply, _) = apply_decisions(
        &ws.report(),
        &paths(&["src/gamma", "src/nope"]),
        &installer,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.summary.skipped, 2);
    assert!(installer.calls.borrow().is_empty());
    assert!(ws.root.join("src/gamma").exists());
}

#[test]
fn installer_that_cannot_run_fails_each_checkout() {
    let ws = Ws::new();
    let (apply, patch) = apply_decisions(
        &ws.report(),
        &paths(&["src/alpha"]),
        &BrokenInstaller,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.results[0].status, ApplyStatus::Failed);
    assert!(apply.results[0]
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("apt-get not found"));
    assert_eq!(patch, "");
    assert!(ws.root.join("src/alpha").exists());
}

#[test]
fn escaping_paths_are_refused() {
    let ws = Ws::new();
    let mut report = ws.report();
    report.checkouts.push(decision(
        "src/../../outside",
        Replaceability::Full,
        &[("outside", "ros-noetic-outside")],
    ));

    let installer = FakeInstaller::default();
    let (apply, _) = apply_decisions(
        &report,
        &paths(&["src/../../outside"]),
        &installer,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.results[0].status, ApplyStatus::Failed);
    assert!(installer.calls.borrow().is_empty());
}

#[test]
fn clean_failure_is_recorded() {
    let ws = Ws::new();
    let cleaner = FakeCleaner {
        fail: true,
        ..Default::default()
    };

    let (apply, _) = apply_decisions(
        &ws.report(),
        &paths(&["src/alpha"]),
        &FakeInstaller::default(),
        Some(&cleaner),
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.summary.reconciled, 1);
    assert!(apply.clean_error.as_deref().unwrap_or_default().contains("catkin clean"));
    assert!(apply.has_failures());
}

#[test]
fn unchecked_binaries_are_not_installed() {
    let ws = Ws::new();
    let mut report = ws.report();
    report.binaries_checked = false;
    let installer = FakeInstaller::default();

    let (apply, _) = apply_decisions(
        &report,
        &paths(&["src/alpha"]),
        &installer,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.results[0].status, ApplyStatus::Reconciled);
    assert!(installer.calls.borrow().is_empty());
    assert!(!ws.root.join("src/alpha").exists());
}

#[test]
fn repos_manifest_entries_are_removed() {
    let ws = Ws::new();
    fs::write(
        ws.root.join("ws.repos"),
        "repositories:\n  src/alpha:\n    type: git\n    url: https://github.com/org/alpha.git\n    version: main\n  src/beta:\n    type: git\n    url: https://github.com/org/beta.git\n    version: main\n",
    )
    .unwrap();
    let mut report = ws.report();
    report.manifest = Some(manifest_ref(&ws.root, Utf8Path::new("ws.repos")).expect("ref"));

    apply_decisions(
        &report,
        &paths(&["src/alpha"]),
        &FakeInstaller::default(),
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    let names: Vec<String> = SourceManifest::load(&ws.root.join("ws.repos"))
        .expect("load")
        .entries()
        .into_iter()
        .map(|e| e.local_name)
        .collect();
    assert_eq!(names, vec!["src/beta"]);
}

#[test]
fn root_repos_manifest_keyed_by_src_relative_path() {
    let ws = Ws::new();
    fs::write(
        ws.root.join("ws.repos"),
        "repositories:\n  alpha:\n    type: git\n    url: https://github.com/org/alpha.git\n    version: main\n  beta:\n    type: git\n    url: https://github.com/org/beta.git\n    version: main\n",
    )
    .unwrap();
    let mut report = ws.report();
    report.manifest = Some(manifest_ref(&ws.root, Utf8Path::new("ws.repos")).expect("ref"));

    let (apply, patch) = apply_decisions(
        &report,
        &paths(&["src/alpha"]),
        &FakeInstaller::default(),
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    assert_eq!(apply.results[0].status, ApplyStatus::Reconciled);
    assert!(apply.results[0].manifest_entry_removed);
    assert_eq!(apply.results[0].message, None);
    assert!(patch.contains("-  alpha:"));

    let names: Vec<String> = SourceManifest::load(&ws.root.join("ws.repos"))
        .expect("load")
        .entries()
        .into_iter()
        .map(|e| e.local_name)
        .collect();
    assert_eq!(names, vec!["beta"]);
}

#[test]
fn unlisted_checkout_is_replaced_with_a_warning() {
    let ws = Ws::new();
    fs::write(
        ws.root.join("src/.rosinstall"),
        "- git:\n    local-name: beta\n    uri: https://github.com/org/beta.git\n",
    )
    .unwrap();
    let report = ws.report();

    let (apply, patch) = apply_decisions(
        &report,
        &paths(&["src/alpha"]),
        &FakeInstaller::default(),
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    let alpha = &apply.results[0];
    assert_eq!(alpha.status, ApplyStatus::Reconciled);
    assert!(!alpha.manifest_entry_removed);
    assert!(alpha.sources_deleted);
    assert!(alpha
        .message
        .as_deref()
        .unwrap_or_default()
        .starts_with("no entry for src/alpha in "));
    assert_eq!(patch, "");
    assert_eq!(ws.manifest_names(), vec!["beta"]);
}

/// Clears a blocking directory once it is asked to install `unblock_on`.
struct UnblockingInstaller {
    blocker: Utf8PathBuf,
    unblock_on: String,
}

impl Installer for UnblockingInstaller {
    fn install_packages(&self, names: &[String]) -> anyhow::Result<Vec<InstallOutcome>> {
        if names.contains(&self.unblock_on) {
            fs::remove_dir_all(&self.blocker)?;
        }
        Ok(names.iter().map(|n| InstallOutcome::ok(n)).collect())
    }
}

#[test]
fn failed_manifest_write_keeps_the_entry_for_later_saves() {
    let ws = Ws::new();
    let report = ws.report();
    // A directory where the temporary manifest goes makes the first save fail.
    let blocker = ws.root.join("src/.rosinstall.desourcify.tmp");
    fs::create_dir_all(&blocker).unwrap();
    let installer = UnblockingInstaller {
        blocker,
        unblock_on: "ros-noetic-beta".to_string(),
    };

    let (apply, patch) = apply_decisions(
        &report,
        &paths(&["src/alpha", "src/beta"]),
        &installer,
        None,
        tool(),
        &ApplyOptions::default(),
    )
    .expect("apply");

    let alpha = &apply.results[0];
    assert_eq!(alpha.status, ApplyStatus::Failed);
    assert!(!alpha.manifest_entry_removed);
    assert!(!alpha.sources_deleted);
    assert!(alpha
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("manifest update failed"));
    assert!(ws.root.join("src/alpha/package.xml").exists());

    let beta = &apply.results[1];
    assert_eq!(beta.status, ApplyStatus::Reconciled);
    assert!(beta.manifest_entry_removed);

    assert_eq!(ws.manifest_names(), vec!["alpha", "gamma"]);
    assert!(!patch.contains("-    local-name: alpha"));
    assert!(patch.contains("-    local-name: beta"));
}
