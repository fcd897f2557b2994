//! Embeddable core library for desourcify.
//!
//! Provides a clap-free, I/O-abstracted entry point for scanning a workspace
//! and replacing checkouts with binary packages.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits re-exported from [`ports`]:
//! - [`VcsPort`](ports::VcsPort): query checkout state
//! - [`PackageIndex`](ports::PackageIndex): resolve and inspect binary packages
//! - [`Installer`](ports::Installer): install binary packages
//! - [`WorkspaceCleaner`](ports::WorkspaceCleaner): build-tool clean step
//! - [`WritePort`](ports::WritePort): write artifacts
//!
//! The [`adapters`] module provides the shell-backed implementations
//! (`git`, `apt-cache`, `dpkg-query`, `rosdep`, `apt-get`, `catkin`).
//!
//! # Entry points
//!
//! - [`run_scan`](pipeline::run_scan): decide what can be replaced
//! - [`run_apply`](pipeline::run_apply): replace the selected checkouts

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;
mod shell;

pub use pipeline::{ApplyOutcome, ToolError, run_apply, run_scan};
pub use settings::{ApplySettings, ScanSettings};
