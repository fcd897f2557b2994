use crate::homepage::{normalize_git_url, parse_homepage};
use crate::ports::{PackageIndex, VcsPort, WorkspaceView};
use crate::version::commit_from_version;
use camino::{Utf8Path, Utf8PathBuf};
use desourcify_types::checkout::{BinaryPackage, Checkout, CleanState, RemoteState};
use desourcify_types::scan::{
    CheckoutDecision, MismatchReason, PackageDecision, Replaceability, ScanReport,
};
use desourcify_types::tool::ToolInfo;
use tracing::{debug, info};

/// Explicit configuration handed to the reconciler at construction.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub workspace_root: Utf8PathBuf,

    /// Fallback binary name prefix (e.g. `ros-noetic-`) used when the index
    /// cannot resolve a source package.
    pub package_name_prefix: Option<String>,

    /// When false, binaries are not consulted and every package of a clean
    /// checkout counts as matched.
    pub check_binaries: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            workspace_root: Utf8PathBuf::from("."),
            package_name_prefix: None,
            check_binaries: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// No binary package index could be consulted; nothing was scanned.
    #[error("no binary package index available: {0:#}")]
    IndexUnavailable(anyhow::Error),

    #[error("{0:#}")]
    Runtime(#[from] anyhow::Error),
}

pub struct Reconciler<'a> {
    config: ReconcilerConfig,
    vcs: &'a dyn VcsPort,
    index: &'a dyn PackageIndex,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: ReconcilerConfig, vcs: &'a dyn VcsPort, index: &'a dyn PackageIndex) -> Self {
        Self { config, vcs, index }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Decide, for every checkout in the workspace, whether binaries can replace it.
    ///
    /// Re-derives everything from the ports on each call; nothing is cached.
    pub fn scan(
        &self,
        workspace: &dyn WorkspaceView,
        tool: ToolInfo,
        scan_id: String,
    ) -> Result<ScanReport, ScanError> {
        if self.config.check_binaries {
            self.index
                .check_available()
                .map_err(ScanError::IndexUnavailable)?;
        }

        let inventory = workspace.inventory()?;

        let mut report = ScanReport::new(tool, scan_id, self.config.workspace_root.clone());
        report.binaries_checked = self.config.check_binaries;

        let mut checkouts: Vec<CheckoutDecision> = inventory
            .checkouts
            .iter()
            .map(|c| self.evaluate_checkout(c))
            .collect();
        checkouts.sort_by(|a, b| a.path.cmp(&b.path));

        report.checkouts = checkouts;
        report.loose_packages = inventory.loose_packages;
        report.summarize();

        info!(
            checkouts = report.summary.checkouts,
            fully_replaceable = report.summary.fully_replaceable,
            partially_replaceable = report.summary.partially_replaceable,
            "scan finished"
        );
        Ok(report)
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.config.workspace_root.join(rel)
        }
    }

    fn evaluate_checkout(&self, checkout: &Checkout) -> CheckoutDecision {
        let abs = self.abs(&checkout.path);

        // Fail closed: anything we cannot verify counts as local state.
        let clean = match self.vcs.is_checkout_clean(&abs) {
            Ok(state) => state,
            Err(err) => CleanState::Dirty(format!("could not determine state: {err:#}")),
        };

        let remote = match self.vcs.resolve_remote(&abs) {
            Ok(remote) => Some(remote),
            Err(err) => {
                debug!("{}: cannot resolve remote: {:#}", checkout.path, err);
                None
            }
        };

        let packages: Vec<PackageDecision> = checkout
            .packages
            .iter()
            .map(|p| self.evaluate_package(&p.name, remote.as_ref()))
            .collect();

        let decision = classify(&clean, &packages);
        debug!(
            checkout = checkout.path.as_str(),
            decision = decision.as_str(),
            "classified checkout"
        );

        CheckoutDecision {
            path: checkout.path.clone(),
            decision,
            clean,
            remote,
            packages,
        }
    }

    fn evaluate_package(&self, name: &str, remote: Option<&RemoteState>) -> PackageDecision {
        if !self.config.check_binaries {
            return PackageDecision::matched(name, None, false);
        }

        let names = match self.binary_names(name) {
            Ok(names) => names,
            Err(err) => {
                return PackageDecision::unmatched(
                    name,
                    None,
                    false,
                    MismatchReason::LookupFailed {
                        message: format!("{err:#}"),
                    },
                );
            }
        };

        let binary = match names.as_slice() {
            [] => return PackageDecision::unmatched(name, None, false, MismatchReason::NoBinary),
            [one] => one.clone(),
            many => {
                return PackageDecision::unmatched(
                    name,
                    None,
                    false,
                    MismatchReason::AmbiguousBinary {
                        candidates: many.to_vec(),
                    },
                );
            }
        };

        let pkg = match self.index.query_binary_package(&binary) {
            Ok(Some(pkg)) => pkg,
            Ok(None) => {
                let reason = MismatchReason::NotInIndex {
                    binary: binary.clone(),
                };
                return PackageDecision::unmatched(name, Some(binary), false, reason);
            }
            Err(err) => {
                let reason = MismatchReason::LookupFailed {
                    message: format!("{err:#}"),
                };
                return PackageDecision::unmatched(name, Some(binary), false, reason);
            }
        };

        match match_binary(&pkg, remote) {
            Ok(()) => PackageDecision::matched(name, Some(binary), pkg.installed),
            Err(reason) => PackageDecision::unmatched(name, Some(binary), pkg.installed, reason),
        }
    }

    fn binary_names(&self, source: &str) -> anyhow::Result<Vec<String>> {
        let names = self.index.resolve_binary_names(source)?;
        if !names.is_empty() {
            return Ok(names);
        }
        Ok(self
            .config
            .package_name_prefix
            .as_deref()
            .map(|prefix| vec![binary_name_from_prefix(prefix, source)])
            .unwrap_or_default())
    }
}

/// `ros-noetic-` + `hector_gazebo` -> `ros-noetic-hector-gazebo`.
pub fn binary_name_from_prefix(prefix: &str, source: &str) -> String {
    format!("{}{}", prefix, source.replace('_', "-").to_ascii_lowercase())
}

fn classify(clean: &CleanState, packages: &[PackageDecision]) -> Replaceability {
    if !clean.is_clean() || packages.is_empty() {
        return Replaceability::NotReplaceable;
    }
    let matched = packages.iter().filter(|p| p.matched).count();
    if matched == packages.len() {
        Replaceability::Full
    } else if matched > 0 {
        Replaceability::Partial
    } else {
        Replaceability::NotReplaceable
    }
}

fn match_binary(pkg: &BinaryPackage, remote: Option<&RemoteState>) -> Result<(), MismatchReason> {
    let raw = pkg
        .homepage
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(MismatchReason::MissingHomepage)?;
    let homepage = parse_homepage(raw).ok_or_else(|| MismatchReason::UnparseableHomepage {
        homepage: raw.to_string(),
    })?;
    let binary_commit =
        commit_from_version(&pkg.version).ok_or_else(|| MismatchReason::UnresolvableCommit {
            version: pkg.version.clone(),
        })?;
    let remote = remote.ok_or(MismatchReason::UnknownRemote)?;

    if normalize_git_url(&homepage.url) != normalize_git_url(&remote.url) {
        return Err(MismatchReason::UrlMismatch {
            binary_url: homepage.url,
            local_url: remote.url.clone(),
        });
    }
    if homepage.branch != remote.branch {
        return Err(MismatchReason::BranchMismatch {
            binary_branch: homepage.branch,
            local_branch: remote.branch.clone(),
        });
    }
    if !commit_matches(&binary_commit, &remote.commit) {
        return Err(MismatchReason::CommitMismatch {
            binary_commit,
            local_commit: remote.commit.clone(),
        });
    }
    Ok(())
}

/// The binary's commit is usually abbreviated; it matches when it prefixes HEAD.
fn commit_matches(binary: &str, local: &str) -> bool {
    let binary = binary.to_ascii_lowercase();
    !binary.is_empty() && local.to_ascii_lowercase().starts_with(&binary)
}
