//! Workspace inventory types: checkouts, their packages and the binary
//! packages that may replace them.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A package found in the workspace source tree (a directory holding `package.xml`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePackage {
    pub name: String,

    /// Package directory, relative to the workspace root.
    pub path: Utf8PathBuf,
}

/// A git checkout in the workspace and the packages it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Checkout directory, relative to the workspace root.
    pub path: Utf8PathBuf,

    #[serde(default)]
    pub packages: Vec<SourcePackage>,
}

/// Everything discovered under the workspace source directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInventory {
    #[serde(default)]
    pub checkouts: Vec<Checkout>,

    /// Packages that do not live inside any git checkout.
    #[serde(default)]
    pub loose_packages: Vec<SourcePackage>,
}

/// Where a checkout's HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub url: String,
    pub branch: String,
    pub commit: String,
}

/// Result of asking the VCS whether a checkout carries local-only state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum CleanState {
    Clean,
    Dirty(String),
}

impl CleanState {
    pub fn is_clean(&self) -> bool {
        matches!(self, CleanState::Clean)
    }
}

/// Metadata of an installable binary package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPackage {
    pub name: String,

    /// Candidate version as reported by the package index.
    pub version: String,

    /// Raw homepage field, expected as `<git-url>#<branch>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default)]
    pub installed: bool,
}
