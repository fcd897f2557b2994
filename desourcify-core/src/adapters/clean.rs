use crate::ports::WorkspaceCleaner;
use crate::shell::run_inherited;
use camino::Utf8PathBuf;
use tracing::info;

/// Runs the build tool's clean command (`catkin clean -y` by default) with
/// the package names appended, inside the workspace root.
#[derive(Debug, Clone)]
pub struct CommandCleaner {
    workspace_root: Utf8PathBuf,
    command: Vec<String>,
}

impl CommandCleaner {
    pub fn new(workspace_root: Utf8PathBuf, command: Vec<String>) -> Self {
        Self {
            workspace_root,
            command,
        }
    }

    pub fn default_command() -> Vec<String> {
        vec!["catkin".into(), "clean".into(), "-y".into()]
    }
}

impl WorkspaceCleaner for CommandCleaner {
    fn clean_packages(&self, names: &[String]) -> anyhow::Result<()> {
        if self.command.is_empty() || names.is_empty() {
            return Ok(());
        }
        let mut argv = self.command.clone();
        argv.extend(names.iter().cloned());

        info!("{}", argv.join(" "));
        let status = run_inherited(&argv, Some(&self.workspace_root))?;
        if !status.success() {
            anyhow::bail!("`{}` exited with {}", argv.join(" "), status);
        }
        Ok(())
    }
}
