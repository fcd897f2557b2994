//! Rendering helpers for human-readable output: terminal text and markdown artifacts.

use desourcify_types::apply::{ApplyReport, ApplyStatus};
use desourcify_types::checkout::CleanState;
use desourcify_types::scan::{CheckoutDecision, Replaceability, ScanReport};

/// Terminal message styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Error,
    Warning,
    Info,
    Success,
}

impl Style {
    fn ansi(self) -> &'static str {
        match self {
            Style::Error => "\x1b[0;31m",
            Style::Warning => "\x1b[0;33m",
            Style::Info => "\x1b[0;34m",
            Style::Success => "\x1b[0;32m",
        }
    }
}

const RESET: &str = "\x1b[0;39m";

/// Applies [`Style`]s when colour is enabled, passes text through otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn paint(&self, style: Style, msg: &str) -> String {
        if self.color {
            format!("{}{}{}", style.ansi(), msg, RESET)
        } else {
            msg.to_string()
        }
    }

    fn line(&self, out: &mut String, style: Style, msg: &str) {
        out.push_str(&self.paint(style, msg));
        out.push('\n');
    }
}

/// Scan result for the terminal.
///
/// With `verbose`, every checkout that cannot be replaced is listed with the
/// reason, as are packages outside any checkout.
pub fn render_scan_text(report: &ScanReport, painter: &Painter, verbose: bool) -> String {
    let mut out = String::new();

    if verbose {
        for pkg in &report.loose_packages {
            out.push_str(&format!(
                "{} not removable because it is not in a git repo.\n",
                pkg.name
            ));
        }
        for c in report.checkouts.iter().filter(|c| !c.is_fully_replaceable()) {
            explain_checkout(&mut out, painter, c);
        }
    }

    let s = &report.summary;
    out.push_str(&format!(
        "Found {} checkout(s) with {} package(s): {} fully, {} partially, {} not replaceable.\n",
        s.checkouts, s.packages, s.fully_replaceable, s.partially_replaceable, s.not_replaceable
    ));
    if !report.binaries_checked {
        painter.line(
            &mut out,
            Style::Warning,
            "Binary packages were not checked (--no-debs).",
        );
    }

    if s.fully_replaceable == 0 {
        painter.line(
            &mut out,
            Style::Info,
            "Nothing to replace. Run again with -v (or --verbose) to find out why.",
        );
    }

    out
}

fn explain_checkout(out: &mut String, painter: &Painter, c: &CheckoutDecision) {
    if let CleanState::Dirty(reason) = &c.clean {
        painter.line(
            out,
            Style::Warning,
            &format!("{} not removable: {}.", c.path, reason),
        );
        return;
    }

    if c.packages.is_empty() {
        out.push_str(&format!("{} not removable because it contains no packages.\n", c.path));
        return;
    }

    let unmatched: Vec<_> = c.packages.iter().filter(|p| !p.matched).collect();
    out.push_str(&format!(
        "{} {}: {} of {} package(s) do not match a binary.\n",
        c.path,
        c.decision.as_str(),
        unmatched.len(),
        c.packages.len()
    ));
    for p in unmatched {
        let reason = p
            .reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!("  - {}: {}\n", p.name, reason));
    }
}

/// Per-checkout progress and the final verdict of an apply.
pub fn render_apply_text(apply: &ApplyReport, painter: &Painter) -> String {
    let mut out = String::new();

    for r in &apply.results {
        painter.line(&mut out, Style::Info, &format!(">>> Replacing {}...", r.path));
        match r.status {
            ApplyStatus::Reconciled => {
                if r.installed.is_empty() {
                    painter.line(
                        &mut out,
                        Style::Success,
                        "All required packages already installed!",
                    );
                } else {
                    out.push_str(&format!("Installed {}.\n", r.installed.join(", ")));
                }
                if r.manifest_entry_removed {
                    out.push_str(&format!("Removed {} from the manifest.\n", r.path));
                }
                if let Some(msg) = &r.message {
                    painter.line(&mut out, Style::Warning, msg);
                }
                if r.sources_deleted {
                    painter.line(&mut out, Style::Info, &format!("Deleted {}.", r.path));
                }
            }
            ApplyStatus::Skipped => {
                let msg = r.message.as_deref().unwrap_or("skipped");
                painter.line(&mut out, Style::Warning, &format!("{}: {}", r.path, msg));
                if apply.dry_run && !r.installed.is_empty() {
                    out.push_str(&format!("Would install {}.\n", r.installed.join(", ")));
                }
            }
            ApplyStatus::Failed => {
                let msg = r.message.as_deref().unwrap_or("failed");
                painter.line(
                    &mut out,
                    Style::Error,
                    &format!("Did not replace '{}': {}", r.path, msg),
                );
            }
        }
    }

    if !apply.dry_run && !apply.cleaned_packages.is_empty() {
        painter.line(&mut out, Style::Info, "Cleaning workspace...");
        if let Some(err) = &apply.clean_error {
            painter.line(
                &mut out,
                Style::Error,
                &format!("Cleaning failed! Your workspace may be dirty! ({err})"),
            );
        }
    }

    if apply.dry_run {
        painter.line(&mut out, Style::Info, "Dry run: nothing was changed.");
    } else if apply.has_failures() {
        painter.line(
            &mut out,
            Style::Error,
            &format!(
                "Finished with {} failed checkout(s).",
                apply.summary.failed
            ),
        );
    } else {
        painter.line(&mut out, Style::Success, "All done!");
    }

    out
}

pub fn render_scan_md(report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str("# desourcify scan\n\n");
    out.push_str(&format!("- Workspace: `{}`\n", report.workspace_root));
    if let Some(m) = &report.manifest {
        out.push_str(&format!("- Manifest: `{}`\n", m.path));
    }
    out.push_str(&format!("- Binaries checked: `{}`\n", report.binaries_checked));
    let s = &report.summary;
    out.push_str(&format!(
        "- Checkouts: {} (fully {}, partially {}, not {})\n",
        s.checkouts, s.fully_replaceable, s.partially_replaceable, s.not_replaceable
    ));
    out.push_str(&format!(
        "- Packages: {} (loose {})\n\n",
        s.packages, s.loose_packages
    ));

    out.push_str("## Checkouts\n\n");
    if report.checkouts.is_empty() {
        out.push_str("_No checkouts found._\n");
    }

    for (i, c) in report.checkouts.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, c.path));
        out.push_str(&format!("- Decision: `{}`\n", decision_label(c.decision)));
        match &c.clean {
            CleanState::Clean => out.push_str("- State: `clean`\n"),
            CleanState::Dirty(reason) => out.push_str(&format!("- State: `dirty` ({reason})\n")),
        }
        if let Some(remote) = &c.remote {
            out.push_str(&format!(
                "- Remote: `{}` branch `{}` at `{}`\n",
                remote.url, remote.branch, remote.commit
            ));
        }
        if !c.packages.is_empty() {
            out.push_str("\n**Packages**\n\n");
            for p in &c.packages {
                let bin = p.binary.as_deref().unwrap_or("-");
                let mark = if p.matched { "matched" } else { "unmatched" };
                out.push_str(&format!("- `{}` → `{}` {}", p.name, bin, mark));
                if let Some(reason) = &p.reason {
                    out.push_str(&format!(": {}", reason));
                }
                out.push('\n');
            }
        }
        out.push('\n');
    }

    if !report.loose_packages.is_empty() {
        out.push_str("## Loose packages\n\n");
        for p in &report.loose_packages {
            out.push_str(&format!("- `{}` at `{}`\n", p.name, p.path));
        }
    }

    out
}

pub fn render_apply_md(apply: &ApplyReport) -> String {
    let mut out = String::new();
    out.push_str("# desourcify apply\n\n");
    out.push_str(&format!(
        "- Selected: {}\n- Reconciled: {}\n- Skipped: {}\n- Failed: {}\n- Dry run: `{}`\n\n",
        apply.summary.selected,
        apply.summary.reconciled,
        apply.summary.skipped,
        apply.summary.failed,
        apply.dry_run
    ));

    out.push_str("## Results\n\n");
    if apply.results.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }

    for (i, r) in apply.results.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, r.path));
        out.push_str(&format!("- Status: `{}`\n", status_label(r.status)));
        if let Some(msg) = &r.message {
            out.push_str(&format!("- Message: {}\n", msg));
        }
        if !r.installed.is_empty() {
            out.push_str(&format!("- Installed: {}\n", r.installed.join(", ")));
        }
        if !r.failed_installs.is_empty() {
            out.push_str(&format!(
                "- Failed installs: {}\n",
                r.failed_installs.join(", ")
            ));
        }
        out.push_str(&format!(
            "- Manifest entry removed: `{}`\n- Sources deleted: `{}`\n",
            r.manifest_entry_removed, r.sources_deleted
        ));
        out.push('\n');
    }

    if !apply.cleaned_packages.is_empty() {
        out.push_str("## Clean\n\n");
        out.push_str(&format!(
            "- Packages: {}\n",
            apply.cleaned_packages.join(", ")
        ));
        if let Some(err) = &apply.clean_error {
            out.push_str(&format!("- Error: {}\n", err));
        }
    }

    out
}

fn decision_label(d: Replaceability) -> &'static str {
    match d {
        Replaceability::Full => "full",
        Replaceability::Partial => "partial",
        Replaceability::NotReplaceable => "not_replaceable",
    }
}

fn status_label(s: ApplyStatus) -> &'static str {
    match s {
        ApplyStatus::Reconciled => "reconciled",
        ApplyStatus::Skipped => "skipped",
        ApplyStatus::Failed => "failed",
    }
}
