//! Port traits abstracting all I/O away from the pipeline.

use camino::Utf8Path;

pub use desourcify_domain::{PackageIndex, VcsPort, WorkspaceView};
pub use desourcify_edit::{InstallOutcome, Installer, WorkspaceCleaner};

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
