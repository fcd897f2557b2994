use crate::discovery::discover_workspace;
use camino::{Utf8Path, Utf8PathBuf};
use desourcify_types::checkout::{BinaryPackage, CleanState, RemoteState, WorkspaceInventory};

/// Read-only view of the workspace's packages and checkouts.
///
/// desourcify-domain uses this so scans can run against an in-memory inventory in tests.
pub trait WorkspaceView {
    fn root(&self) -> &Utf8Path;

    fn inventory(&self) -> anyhow::Result<WorkspaceInventory>;
}

/// Version-control queries for a single checkout. Paths are absolute.
pub trait VcsPort {
    /// Whether the checkout has no local-only state (changes, stashes, unpushed commits).
    fn is_checkout_clean(&self, path: &Utf8Path) -> anyhow::Result<CleanState>;

    fn resolve_remote(&self, path: &Utf8Path) -> anyhow::Result<RemoteState>;
}

/// Binary package index (apt cache + rosdep in production).
pub trait PackageIndex {
    /// Fails when no index can be consulted at all.
    fn check_available(&self) -> anyhow::Result<()>;

    /// Binary package names a source package resolves to. Empty when unknown.
    fn resolve_binary_names(&self, source_package: &str) -> anyhow::Result<Vec<String>>;

    /// Metadata of a binary package, `None` when the index does not know it.
    fn query_binary_package(&self, binary: &str) -> anyhow::Result<Option<BinaryPackage>>;
}

/// File-system backed `WorkspaceView`.
#[derive(Debug, Clone)]
pub struct FsWorkspaceView {
    root: Utf8PathBuf,
    src_dir: Utf8PathBuf,
}

impl FsWorkspaceView {
    /// `src_dir` is relative to `root` (usually `src`).
    pub fn new(root: Utf8PathBuf, src_dir: Utf8PathBuf) -> Self {
        Self { root, src_dir }
    }
}

impl WorkspaceView for FsWorkspaceView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn inventory(&self) -> anyhow::Result<WorkspaceInventory> {
        discover_workspace(&self.root, &self.src_dir)
    }
}
