//! Configuration file loading for desourcify.
//!
//! Discovers and loads `desourcify.toml` from the workspace root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "desourcify.toml";

/// Top-level configuration from desourcify.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DesourcifyConfig {
    pub workspace: WorkspaceConfig,
    pub packages: PackagesConfig,
    pub install: InstallConfig,
    pub clean: CleanConfig,
}

/// Workspace layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Source directory relative to the workspace root.
    pub src_dir: Utf8PathBuf,

    /// Source manifest, relative to the workspace root. Discovered when unset.
    pub manifest: Option<Utf8PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            src_dir: Utf8PathBuf::from("src"),
            manifest: None,
        }
    }
}

/// Binary package resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Prefix used to guess binary package names, e.g. `ros-noetic-`.
    pub name_prefix: Option<String>,

    /// Ask `rosdep resolve` for binary package names.
    pub rosdep: bool,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            name_prefix: None,
            rosdep: true,
        }
    }
}

/// Install command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub sudo: bool,

    /// Command the package names are appended to.
    pub command: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            sudo: true,
            command: vec!["apt-get".into(), "install".into(), "-y".into()],
        }
    }
}

/// Build tool clean step run after replacing checkouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Command the package names are appended to. Empty disables the step.
    pub command: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            command: vec!["catkin".into(), "clean".into(), "-y".into()],
        }
    }
}

/// Discover the desourcify.toml config file in the workspace root.
pub fn discover_config(workspace_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a desourcify.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<DesourcifyConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<DesourcifyConfig> {
    let config: DesourcifyConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the workspace root, or return default if not found.
pub fn load_or_default(workspace_root: &Utf8Path) -> anyhow::Result<DesourcifyConfig> {
    match discover_config(workspace_root) {
        Some(path) => load_config(&path),
        None => Ok(DesourcifyConfig::default()),
    }
}

/// Command line values that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub manifest: Option<Utf8PathBuf>,
    pub prefix: Option<String>,
    pub no_sudo: bool,
    pub no_debs: bool,
}

/// Configuration after merging the config file with CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub src_dir: Utf8PathBuf,
    pub manifest: Option<Utf8PathBuf>,
    pub name_prefix: Option<String>,
    pub rosdep: bool,
    pub check_binaries: bool,
    pub sudo: bool,
    pub install_command: Vec<String>,
    pub clean_command: Vec<String>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: DesourcifyConfig,
}

impl ConfigMerger {
    pub fn new(config: DesourcifyConfig) -> Self {
        Self { config }
    }

    /// Merge with the CLI arguments.
    ///
    /// Relative manifest paths from the config file are resolved against the
    /// workspace root; a `--manifest` given on the command line is used as is.
    /// Without any configured prefix, `ros_distro` yields `ros-<distro>-`.
    pub fn merge(
        self,
        workspace_root: &Utf8Path,
        cli: &CliOverrides,
        ros_distro: Option<&str>,
    ) -> MergedConfig {
        let DesourcifyConfig {
            workspace,
            packages,
            install,
            clean,
        } = self.config;

        let manifest = cli.manifest.clone().or_else(|| {
            workspace.manifest.map(|m| {
                if m.is_absolute() {
                    m
                } else {
                    workspace_root.join(m)
                }
            })
        });

        let name_prefix = cli
            .prefix
            .clone()
            .or(packages.name_prefix)
            .or_else(|| {
                ros_distro
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(|d| format!("ros-{d}-"))
            });

        MergedConfig {
            src_dir: workspace.src_dir,
            manifest,
            name_prefix,
            rosdep: packages.rosdep,
            check_binaries: !cli.no_debs,
            sudo: install.sudo && !cli.no_sudo,
            install_command: install.command,
            clean_command: clean.command,
        }
    }
}
