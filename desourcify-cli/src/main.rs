mod config;
mod select;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use config::{CliOverrides, ConfigMerger, MergedConfig};
use desourcify_core::adapters::{
    AptInstaller, AptPackageIndex, CommandCleaner, FsWritePort, GitCliVcs,
};
use desourcify_core::pipeline::{write_apply_artifacts, write_scan_artifacts};
use desourcify_core::ports::WorkspaceCleaner;
use desourcify_core::{ApplySettings, ScanSettings, ToolError, run_apply, run_scan};
use desourcify_render::{Painter, render_apply_text, render_scan_text};
use desourcify_types::scan::{CheckoutDecision, ScanReport};
use desourcify_types::tool::ToolInfo;
use fs_err as fs;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const NO_WORKSPACE: &str = "No workspace found! Did you source the setup.bash?";

#[derive(Debug, Parser)]
#[command(
    name = "desourcify",
    version,
    about = "Replace source checkouts in a ROS workspace with the binary packages built from them."
)]
struct Cli {
    /// Workspace root (default: parent of $ROS_WORKSPACE).
    #[arg(long, env = "DESOURCIFY_WORKSPACE")]
    workspace: Option<Utf8PathBuf>,

    /// Explain why checkouts and packages are not replaceable.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Do not check for or install binary packages.
    #[arg(long, default_value_t = false)]
    no_debs: bool,

    /// Run the install command without sudo.
    #[arg(long, default_value_t = false)]
    no_sudo: bool,

    /// Select every fully replaceable checkout without asking.
    #[arg(short = 'y', long = "yes", default_value_t = false)]
    assume_yes: bool,

    /// Show the report and the manifest diff, change nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Source manifest (default: <workspace>/src/.rosinstall or <workspace>/*.repos).
    #[arg(long)]
    manifest: Option<Utf8PathBuf>,

    /// Binary package name prefix (default: ros-$ROS_DISTRO-).
    #[arg(long)]
    prefix: Option<String>,

    /// Write JSON and markdown artifacts to this directory.
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// When to colour terminal output.
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stdout().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn real_main() -> Result<u8, ToolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let painter = Painter::new(cli.color.enabled());

    let workspace_root = resolve_workspace(
        cli.workspace.as_deref(),
        std::env::var("ROS_WORKSPACE").ok().as_deref(),
    )?;
    info!("workspace {}", workspace_root);

    let file_config =
        config::load_or_default(&workspace_root).context("load desourcify.toml config")?;
    let overrides = CliOverrides {
        manifest: cli.manifest.clone(),
        prefix: cli.prefix.clone(),
        no_sudo: cli.no_sudo,
        no_debs: cli.no_debs,
    };
    let ros_distro = std::env::var("ROS_DISTRO").ok();
    let merged =
        ConfigMerger::new(file_config).merge(&workspace_root, &overrides, ros_distro.as_deref());
    debug!("merged config: {:?}", merged);

    let tool = tool_info();
    let report = scan(&workspace_root, &merged, tool.clone())?;
    print!("{}", render_scan_text(&report, &painter, cli.verbose));
    if let Some(out_dir) = &cli.out_dir {
        write_scan_artifacts(&report, out_dir, &FsWritePort)?;
    }

    let candidates: Vec<&CheckoutDecision> = report.replaceable().collect();
    if candidates.is_empty() {
        return Ok(0);
    }

    let selection = if cli.assume_yes {
        candidates.iter().map(|c| c.path.clone()).collect()
    } else {
        match choose(&candidates)? {
            Some(paths) => paths,
            None => {
                println!("Cancelled.");
                return Ok(0);
            }
        }
    };
    if selection.is_empty() {
        println!("Nothing selected.");
        return Ok(0);
    }

    let installer = AptInstaller::new(merged.sudo, merged.install_command.clone());
    let cleaner = CommandCleaner::new(workspace_root.clone(), merged.clean_command.clone());
    let cleaner: Option<&dyn WorkspaceCleaner> = if merged.clean_command.is_empty() {
        None
    } else {
        Some(&cleaner)
    };

    let settings = ApplySettings {
        dry_run: cli.dry_run,
    };
    let outcome = run_apply(&settings, &report, &selection, &installer, cleaner, tool)?;

    print!("{}", render_apply_text(&outcome.apply, &painter));
    if cli.dry_run && !outcome.patch.is_empty() {
        print!("{}", outcome.patch);
    }
    if let Some(out_dir) = &cli.out_dir {
        write_apply_artifacts(&outcome, out_dir, &FsWritePort)?;
        info!("wrote apply artifacts to {}", out_dir);
    }

    Ok(outcome.exit_code())
}

fn scan(root: &Utf8Path, merged: &MergedConfig, tool: ToolInfo) -> Result<ScanReport, ToolError> {
    let settings = ScanSettings {
        workspace_root: root.to_path_buf(),
        src_dir: merged.src_dir.clone(),
        manifest: merged.manifest.clone(),
        package_name_prefix: merged.name_prefix.clone(),
        check_binaries: merged.check_binaries,
    };
    let vcs = GitCliVcs::new();
    let index = AptPackageIndex::new(merged.rosdep);
    run_scan(&settings, &vcs, &index, tool)
}

/// Explicit workspace first, then the parent of `$ROS_WORKSPACE`.
fn resolve_workspace(
    explicit: Option<&Utf8Path>,
    ros_workspace: Option<&str>,
) -> anyhow::Result<Utf8PathBuf> {
    let candidate = match (explicit, ros_workspace.filter(|s| !s.trim().is_empty())) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(ros_ws)) => Utf8Path::new(ros_ws.trim())
            .parent()
            .map(Utf8Path::to_path_buf)
            .filter(|p| !p.as_str().is_empty())
            .context(NO_WORKSPACE)?,
        (None, None) => anyhow::bail!(NO_WORKSPACE),
    };

    let canonical = fs::canonicalize(&candidate)
        .with_context(|| format!("{NO_WORKSPACE} ({candidate} is not accessible)"))?;
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|p| anyhow::anyhow!("workspace path is not UTF-8: {}", p.display()))
}

/// Interactive selection over stdin/stdout.
fn choose(candidates: &[&CheckoutDecision]) -> anyhow::Result<Option<Vec<Utf8PathBuf>>> {
    let labels: Vec<String> = candidates
        .iter()
        .map(|c| format!("{} ({})", c.path, c.package_names().join(", ")))
        .collect();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let picked = select::multiselect(&labels, stdin.lock(), stdout.lock())?;
    Ok(picked.map(|indices| {
        indices
            .into_iter()
            .map(|i| candidates[i].path.clone())
            .collect()
    }))
}

fn tool_info() -> ToolInfo {
    ToolInfo::new("desourcify", Some(env!("CARGO_PKG_VERSION").to_string()))
}
