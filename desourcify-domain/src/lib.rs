//! Domain logic: turn a workspace inventory plus VCS and package-index state into
//! per-checkout reconciliation decisions.
//!
//! This crate owns *what* can be replaced and why. It does not own *how* the
//! replacement is carried out; that's the `desourcify-edit` crate.

mod discovery;
mod homepage;
mod ports;
mod reconciler;
mod version;

pub use discovery::{discover_workspace, package_name_from_xml, IGNORE_MARKERS};
pub use homepage::{normalize_git_url, parse_homepage, Homepage};
pub use ports::{FsWorkspaceView, PackageIndex, VcsPort, WorkspaceView};
pub use reconciler::{binary_name_from_prefix, Reconciler, ReconcilerConfig, ScanError};
pub use version::commit_from_version;
