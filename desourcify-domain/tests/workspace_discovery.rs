//! Discovery tests against real directory trees.

use camino::{Utf8Path, Utf8PathBuf};
use desourcify_domain::{FsWorkspaceView, WorkspaceView};
use fs_err as fs;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn package(root: &Utf8Path, rel: &str, name: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.xml"),
        format!("<?xml version=\"1.0\"?>\n<package format=\"2\">\n  <name>{name}</name>\n</package>\n"),
    )
    .unwrap();
}

fn git_marker(root: &Utf8Path, rel: &str) {
    fs::create_dir_all(root.join(rel).join(".git")).unwrap();
}

fn temp_ws() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    (temp, root)
}

#[test]
fn groups_packages_by_checkout() {
    let (_temp, root) = temp_ws();
    git_marker(&root, "src/driver");
    package(&root, "src/driver/driver_msgs", "driver_msgs");
    package(&root, "src/driver/driver_core", "driver_core");
    git_marker(&root, "src/single");
    package(&root, "src/single", "single_pkg");

    let view = FsWorkspaceView::new(root.clone(), Utf8PathBuf::from("src"));
    let inventory = view.inventory().expect("inventory");

    let paths: Vec<&str> = inventory.checkouts.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["src/driver", "src/single"]);

    let names: Vec<&str> = inventory.checkouts[0]
        .packages
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["driver_core", "driver_msgs"]);
    assert_eq!(inventory.checkouts[1].packages[0].path.as_str(), "src/single");
    assert!(inventory.loose_packages.is_empty());
}

#[test]
fn packages_outside_checkouts_are_loose() {
    let (_temp, root) = temp_ws();
    // A workspace root that is itself a repository is not a checkout.
    git_marker(&root, "");
    package(&root, "src/local_pkg", "local_pkg");

    let view = FsWorkspaceView::new(root.clone(), Utf8PathBuf::from("src"));
    let inventory = view.inventory().expect("inventory");

    assert!(inventory.checkouts.is_empty());
    assert_eq!(inventory.loose_packages.len(), 1);
    assert_eq!(inventory.loose_packages[0].name, "local_pkg");
}

#[test]
fn skips_ignored_hidden_and_nested_packages() {
    let (_temp, root) = temp_ws();
    git_marker(&root, "src/repo");
    package(&root, "src/repo/pkg", "pkg");
    package(&root, "src/repo/pkg/test/fixture_pkg", "fixture_pkg");
    package(&root, "src/repo/disabled", "disabled");
    fs::write(root.join("src/repo/disabled/COLCON_IGNORE"), "").unwrap();
    package(&root, "src/.cache/pkg", "cached");

    let view = FsWorkspaceView::new(root.clone(), Utf8PathBuf::from("src"));
    let inventory = view.inventory().expect("inventory");

    assert_eq!(inventory.checkouts.len(), 1);
    let names: Vec<&str> = inventory.checkouts[0]
        .packages
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["pkg"]);
    assert!(inventory.loose_packages.is_empty());
}

#[test]
fn missing_src_dir_is_an_error() {
    let (_temp, root) = temp_ws();
    let view = FsWorkspaceView::new(root.clone(), Utf8PathBuf::from("src"));
    let err = view.inventory().expect_err("missing src");
    assert!(err.to_string().contains("does not exist"));
}
