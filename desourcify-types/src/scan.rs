use crate::checkout::{CleanState, RemoteState, SourcePackage};
use crate::tool::ToolInfo;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of scanning a workspace for checkouts that binaries could replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub scan_id: String,
    pub workspace_root: Utf8PathBuf,

    /// Source directory relative to the workspace root.
    #[serde(default = "default_src_dir")]
    pub src_dir: Utf8PathBuf,

    /// Source manifest as seen at scan time, if the workspace has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestRef>,

    /// False when binaries were not consulted (`--no-debs`).
    #[serde(default = "default_true")]
    pub binaries_checked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub checkouts: Vec<CheckoutDecision>,

    #[serde(default)]
    pub loose_packages: Vec<SourcePackage>,

    pub summary: ScanSummary,
}

fn default_true() -> bool {
    true
}

fn default_src_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("src")
}

impl ScanReport {
    pub fn new(tool: ToolInfo, scan_id: String, workspace_root: Utf8PathBuf) -> Self {
        Self {
            schema: crate::schema::DESOURCIFY_SCAN_V1.to_string(),
            tool,
            scan_id,
            workspace_root,
            src_dir: default_src_dir(),
            manifest: None,
            binaries_checked: true,
            started_at: None,
            ended_at: None,
            checkouts: vec![],
            loose_packages: vec![],
            summary: ScanSummary::default(),
        }
    }

    /// Checkouts that can be replaced entirely, in path order.
    pub fn replaceable(&self) -> impl Iterator<Item = &CheckoutDecision> {
        self.checkouts.iter().filter(|c| c.is_fully_replaceable())
    }

    pub fn find(&self, path: &Utf8Path) -> Option<&CheckoutDecision> {
        self.checkouts.iter().find(|c| c.path == path)
    }

    /// Recompute `summary` from `checkouts`.
    pub fn summarize(&mut self) {
        let mut summary = ScanSummary::default();
        for c in &self.checkouts {
            match c.decision {
                Replaceability::Full => summary.fully_replaceable += 1,
                Replaceability::Partial => summary.partially_replaceable += 1,
                Replaceability::NotReplaceable => summary.not_replaceable += 1,
            }
            summary.packages += c.packages.len() as u64;
        }
        summary.checkouts = self.checkouts.len() as u64;
        summary.loose_packages = self.loose_packages.len() as u64;
        self.summary = summary;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub checkouts: u64,
    pub packages: u64,
    pub fully_replaceable: u64,
    pub partially_replaceable: u64,
    pub not_replaceable: u64,
    pub loose_packages: u64,
}

/// Identity of the source manifest at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRef {
    pub path: Utf8PathBuf,
    pub sha256: String,
}

/// Tri-state reconciliation outcome for one checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replaceability {
    /// Clean, and every package has a binary built from the same state.
    Full,
    /// Clean, but only some packages have a matching binary.
    Partial,
    NotReplaceable,
}

impl Replaceability {
    pub fn as_str(self) -> &'static str {
        match self {
            Replaceability::Full => "fully replaceable",
            Replaceability::Partial => "partially replaceable",
            Replaceability::NotReplaceable => "not replaceable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDecision {
    pub path: Utf8PathBuf,
    pub decision: Replaceability,
    pub clean: CleanState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteState>,

    #[serde(default)]
    pub packages: Vec<PackageDecision>,
}

impl CheckoutDecision {
    pub fn is_fully_replaceable(&self) -> bool {
        self.decision == Replaceability::Full
    }

    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Binary packages that still need installing before the sources can go.
    pub fn binaries_to_install(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .packages
            .iter()
            .filter(|p| !p.binary_installed)
            .filter_map(|p| p.binary.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecision {
    pub name: String,

    /// Resolved binary package name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    #[serde(default)]
    pub binary_installed: bool,

    pub matched: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<MismatchReason>,
}

impl PackageDecision {
    pub fn matched(name: impl Into<String>, binary: Option<String>, installed: bool) -> Self {
        Self {
            name: name.into(),
            binary,
            binary_installed: installed,
            matched: true,
            reason: None,
        }
    }

    pub fn unmatched(
        name: impl Into<String>,
        binary: Option<String>,
        installed: bool,
        reason: MismatchReason,
    ) -> Self {
        Self {
            name: name.into(),
            binary,
            binary_installed: installed,
            matched: false,
            reason: Some(reason),
        }
    }
}

/// Why a package could not be matched to a binary package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchReason {
    NoBinary,
    AmbiguousBinary { candidates: Vec<String> },
    NotInIndex { binary: String },
    LookupFailed { message: String },
    MissingHomepage,
    UnparseableHomepage { homepage: String },
    UnresolvableCommit { version: String },
    UnknownRemote,
    UrlMismatch { binary_url: String, local_url: String },
    BranchMismatch { binary_branch: String, local_branch: String },
    CommitMismatch { binary_commit: String, local_commit: String },
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::NoBinary => write!(f, "no binary package could be resolved"),
            MismatchReason::AmbiguousBinary { candidates } => write!(
                f,
                "resolved to multiple binary packages ({})",
                candidates.join(", ")
            ),
            MismatchReason::NotInIndex { binary } => write!(
                f,
                "binary package {binary} is not in the package index (try apt update)"
            ),
            MismatchReason::LookupFailed { message } => {
                write!(f, "binary package lookup failed: {message}")
            }
            MismatchReason::MissingHomepage => {
                write!(f, "binary package has no homepage field")
            }
            MismatchReason::UnparseableHomepage { homepage } => write!(
                f,
                "homepage '{homepage}' does not follow <url>#<branch>"
            ),
            MismatchReason::UnresolvableCommit { version } => write!(
                f,
                "cannot determine the commit of binary version '{version}'"
            ),
            MismatchReason::UnknownRemote => {
                write!(f, "checkout remote, branch or commit could not be resolved")
            }
            MismatchReason::UrlMismatch {
                binary_url,
                local_url,
            } => write!(
                f,
                "binary is built from {binary_url}, checkout tracks {local_url}"
            ),
            MismatchReason::BranchMismatch {
                binary_branch,
                local_branch,
            } => write!(
                f,
                "binary is built from branch {binary_branch}, checkout is on {local_branch}"
            ),
            MismatchReason::CommitMismatch {
                binary_commit,
                local_commit,
            } => write!(
                f,
                "binary is built from commit {binary_commit}, checkout is at {local_commit}"
            ),
        }
    }
}
