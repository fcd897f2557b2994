use crate::ports::{InstallOutcome, Installer, PackageIndex};
use crate::shell::{capture, run_inherited};
use anyhow::Context;
use desourcify_types::checkout::BinaryPackage;
use tracing::{debug, warn};

/// `PackageIndex` backed by `apt-cache`, `dpkg-query` and optionally `rosdep`.
#[derive(Debug, Clone)]
pub struct AptPackageIndex {
    use_rosdep: bool,
}

impl AptPackageIndex {
    /// With `use_rosdep` false, binary names come from the configured prefix only.
    pub fn new(use_rosdep: bool) -> Self {
        Self { use_rosdep }
    }
}

impl PackageIndex for AptPackageIndex {
    fn check_available(&self) -> anyhow::Result<()> {
        which::which("apt-cache").context("apt-cache not found on PATH")?;
        which::which("dpkg-query").context("dpkg-query not found on PATH")?;
        if self.use_rosdep {
            which::which("rosdep")
                .context("rosdep not found on PATH (set packages.rosdep = false to use the name prefix only)")?;
        }
        Ok(())
    }

    fn resolve_binary_names(&self, source_package: &str) -> anyhow::Result<Vec<String>> {
        if !self.use_rosdep {
            return Ok(vec![]);
        }
        let out = capture("rosdep", &["resolve", source_package], None)?;
        if !out.success() {
            debug!("rosdep cannot resolve {}: {}", source_package, out.stderr.trim());
            return Ok(vec![]);
        }
        Ok(parse_rosdep_resolve(&out.stdout))
    }

    fn query_binary_package(&self, binary: &str) -> anyhow::Result<Option<BinaryPackage>> {
        let out = capture("apt-cache", &["show", "--no-all-versions", binary], None)?;
        if !out.success() {
            return Ok(None);
        }
        let Some((version, homepage)) = parse_apt_show(&out.stdout) else {
            return Ok(None);
        };

        Ok(Some(BinaryPackage {
            name: binary.to_string(),
            version,
            homepage,
            installed: dpkg_installed(binary)?,
        }))
    }
}

/// Installs with `[sudo] apt-get install -y <pkgs>` and verifies each package afterwards.
#[derive(Debug, Clone)]
pub struct AptInstaller {
    sudo: bool,
    command: Vec<String>,
}

impl Default for AptInstaller {
    fn default() -> Self {
        Self {
            sudo: true,
            command: vec!["apt-get".into(), "install".into(), "-y".into()],
        }
    }
}

impl AptInstaller {
    pub fn new(sudo: bool, command: Vec<String>) -> Self {
        Self { sudo, command }
    }

    /// Full argv for installing `names`.
    pub fn argv(&self, names: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.command.len() + names.len() + 1);
        if self.sudo {
            argv.push("sudo".to_string());
        }
        argv.extend(self.command.iter().cloned());
        argv.extend(names.iter().cloned());
        argv
    }
}

impl Installer for AptInstaller {
    fn install_packages(&self, names: &[String]) -> anyhow::Result<Vec<InstallOutcome>> {
        if names.is_empty() {
            return Ok(vec![]);
        }
        let argv = self.argv(names);
        let status = run_inherited(&argv, None)?;
        if !status.success() {
            warn!("`{}` exited with {}", argv.join(" "), status);
        }

        // apt-get may install some packages before failing on another.
        names
            .iter()
            .map(|name| -> anyhow::Result<InstallOutcome> {
                Ok(if dpkg_installed(name)? {
                    InstallOutcome::ok(name)
                } else {
                    InstallOutcome::failed(name, format!("not installed ({status})"))
                })
            })
            .collect()
    }
}

fn dpkg_installed(name: &str) -> anyhow::Result<bool> {
    let out = capture("dpkg-query", &["-W", "-f=${Status}", name], None)?;
    // `install ok installed`; the last word is the package state.
    Ok(out.success() && out.stdout.split_whitespace().last() == Some("installed"))
}

/// `(version, homepage)` of the first stanza of `apt-cache show` output.
pub fn parse_apt_show(stdout: &str) -> Option<(String, Option<String>)> {
    let mut version = None;
    let mut homepage = None;
    for line in stdout.lines() {
        if line.trim().is_empty() {
            if version.is_some() {
                break;
            }
            continue;
        }
        if let Some(v) = line.strip_prefix("Version:") {
            version.get_or_insert_with(|| v.trim().to_string());
        } else if let Some(h) = line.strip_prefix("Homepage:") {
            homepage.get_or_insert_with(|| h.trim().to_string());
        }
    }
    version.map(|v| (v, homepage))
}

/// Package names from `rosdep resolve` output, apt section only.
///
/// ```text
/// #apt
/// ros-noetic-hector-gazebo
/// ```
pub fn parse_rosdep_resolve(stdout: &str) -> Vec<String> {
    let mut in_apt = false;
    let mut names = Vec::new();
    for line in stdout.lines().map(str::trim) {
        if let Some(installer) = line.strip_prefix('#') {
            in_apt = installer.trim() == "apt";
            continue;
        }
        if in_apt {
            names.extend(line.split_whitespace().map(str::to_string));
        }
    }
    names
}
