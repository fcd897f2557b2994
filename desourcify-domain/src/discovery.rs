//! Package and checkout discovery under the workspace source directory.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use desourcify_types::checkout::{Checkout, SourcePackage, WorkspaceInventory};
use fs_err as fs;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Marker files that exclude a directory (and everything below it) from the build.
pub const IGNORE_MARKERS: &[&str] = &["CATKIN_IGNORE", "COLCON_IGNORE", "AMENT_IGNORE"];

const PACKAGE_MANIFEST: &str = "package.xml";

/// Walk `<root>/<src_dir>` for packages and group them by enclosing git checkout.
///
/// A package is a directory holding `package.xml`; discovery does not descend into
/// packages. Checkouts are searched upward from each package but never at or above
/// the source directory, so a workspace that is itself a repository is not treated
/// as one big checkout.
pub fn discover_workspace(
    root: &Utf8Path,
    src_dir: &Utf8Path,
) -> anyhow::Result<WorkspaceInventory> {
    let src = if src_dir.is_absolute() {
        src_dir.to_path_buf()
    } else {
        root.join(src_dir)
    };
    if !src.is_dir() {
        anyhow::bail!("workspace source directory {} does not exist", src);
    }

    let mut checkouts: BTreeMap<Utf8PathBuf, Vec<SourcePackage>> = BTreeMap::new();
    let mut loose = Vec::new();

    for pkg_dir in find_package_dirs(&src)? {
        let manifest = pkg_dir.join(PACKAGE_MANIFEST);
        let contents =
            fs::read_to_string(&manifest).with_context(|| format!("read {}", manifest))?;
        let Some(name) = package_name_from_xml(&contents) else {
            warn!("{} has no <name>, ignoring package", manifest);
            continue;
        };

        let package = SourcePackage {
            name,
            path: relative_to(root, &pkg_dir),
        };

        match enclosing_checkout(&src, &pkg_dir) {
            Some(checkout) => checkouts
                .entry(relative_to(root, &checkout))
                .or_default()
                .push(package),
            None => {
                debug!(package = package.name.as_str(), "package is not in a git checkout");
                loose.push(package);
            }
        }
    }

    let checkouts = checkouts
        .into_iter()
        .map(|(path, mut packages)| {
            packages.sort();
            Checkout { path, packages }
        })
        .collect();
    loose.sort();

    Ok(WorkspaceInventory {
        checkouts,
        loose_packages: loose,
    })
}

fn find_package_dirs(src: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    let mut it = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(dir) = Utf8Path::from_path(entry.path()) else {
            warn!("skipping non UTF-8 path {}", entry.path().display());
            it.skip_current_dir();
            continue;
        };

        let hidden = dir.file_name().is_some_and(|n| n.starts_with('.'));
        if entry.depth() > 0 && hidden {
            it.skip_current_dir();
            continue;
        }
        if IGNORE_MARKERS.iter().any(|m| dir.join(m).exists()) {
            debug!("{} is ignored by marker file", dir);
            it.skip_current_dir();
            continue;
        }
        if dir.join(PACKAGE_MANIFEST).is_file() {
            out.push(dir.to_path_buf());
            it.skip_current_dir();
        }
    }

    Ok(out)
}

fn enclosing_checkout(src: &Utf8Path, pkg_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut cur = Some(pkg_dir);
    while let Some(dir) = cur {
        if dir == src || !dir.starts_with(src) {
            return None;
        }
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        cur = dir.parent();
    }
    None
}

fn relative_to(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Extract the `<name>` element of a `package.xml`, ignoring XML comments.
pub fn package_name_from_xml(contents: &str) -> Option<String> {
    let stripped = strip_xml_comments(contents);
    let start = stripped.find("<name>")? + "<name>".len();
    let len = stripped[start..].find("</name>")?;
    let name = stripped[start..start + len].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn strip_xml_comments(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut rest = contents;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
