//! Clap-free settings for the scan and apply pipelines.

use camino::Utf8PathBuf;

/// Settings for the scan pipeline.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub workspace_root: Utf8PathBuf,

    /// Source directory, relative to the workspace root.
    pub src_dir: Utf8PathBuf,

    /// Source manifest override. Discovered when `None`.
    pub manifest: Option<Utf8PathBuf>,

    pub package_name_prefix: Option<String>,

    /// `false` for `--no-debs`.
    pub check_binaries: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            workspace_root: Utf8PathBuf::from("."),
            src_dir: Utf8PathBuf::from("src"),
            manifest: None,
            package_name_prefix: None,
            check_binaries: true,
        }
    }
}

/// Settings for the apply pipeline.
#[derive(Debug, Clone, Default)]
pub struct ApplySettings {
    pub dry_run: bool,
}
