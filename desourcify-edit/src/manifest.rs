//! Workspace source manifests (`.rosinstall` for wstool, `.repos` for vcstool).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// wstool: a sequence of `- <vcs>: {local-name, uri, version}`.
    Rosinstall,
    /// vcstool: `repositories: {<path>: {type, url, version}}`.
    Repos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Checkout path relative to the manifest's directory.
    pub local_name: String,
    pub uri: Option<String>,
    pub version: Option<String>,
}

/// A parsed source manifest that can drop entries and be written back.
#[derive(Debug, Clone)]
pub struct SourceManifest {
    path: Utf8PathBuf,
    format: ManifestFormat,
    doc: Value,
}

impl SourceManifest {
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        Self::parse(path.to_path_buf(), &contents).with_context(|| format!("parse {}", path))
    }

    pub fn parse(path: Utf8PathBuf, contents: &str) -> anyhow::Result<Self> {
        let doc: Value = if contents.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(contents).context("invalid YAML")?
        };

        let is_repos_file = path.extension() == Some("repos");
        let (format, doc) = match doc {
            Value::Sequence(_) => (ManifestFormat::Rosinstall, doc),
            Value::Mapping(ref m) if m.contains_key("repositories") => (ManifestFormat::Repos, doc),
            Value::Null if is_repos_file => {
                let mut m = Mapping::new();
                m.insert(Value::from("repositories"), Value::Mapping(Mapping::new()));
                (ManifestFormat::Repos, Value::Mapping(m))
            }
            Value::Null => (ManifestFormat::Rosinstall, Value::Sequence(vec![])),
            _ => anyhow::bail!("unrecognized manifest layout (expected .rosinstall or .repos)"),
        };

        Ok(Self { path, format, doc })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn format(&self) -> ManifestFormat {
        self.format
    }

    /// Directory entry paths are relative to.
    pub fn base_dir(&self) -> &Utf8Path {
        self.path.parent().unwrap_or(Utf8Path::new("."))
    }

    pub fn entries(&self) -> Vec<ManifestEntry> {
        match self.format {
            ManifestFormat::Rosinstall => self
                .rosinstall_items()
                .iter()
                .filter_map(rosinstall_entry)
                .collect(),
            ManifestFormat::Repos => self
                .repositories()
                .map(|repos| {
                    repos
                        .iter()
                        .filter_map(|(k, v)| {
                            Some(ManifestEntry {
                                local_name: normalize_local_name(k.as_str()?),
                                uri: str_field(v, "url"),
                                version: str_field(v, "version"),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn contains(&self, local_name: &str) -> bool {
        let wanted = normalize_local_name(local_name);
        self.entries().iter().any(|e| e.local_name == wanted)
    }

    /// Drop the entry for `local_name`. Returns false when there was none.
    pub fn remove(&mut self, local_name: &str) -> bool {
        let wanted = normalize_local_name(local_name);
        match self.format {
            ManifestFormat::Rosinstall => {
                let Value::Sequence(items) = &mut self.doc else {
                    return false;
                };
                let before = items.len();
                items.retain(|item| {
                    rosinstall_entry(item).is_none_or(|e| e.local_name != wanted)
                });
                items.len() != before
            }
            ManifestFormat::Repos => {
                let Some(Value::Mapping(repos)) = self.doc.get_mut("repositories") else {
                    return false;
                };
                let before = repos.len();
                repos.retain(|k, _| {
                    k.as_str()
                        .is_none_or(|name| normalize_local_name(name) != wanted)
                });
                repos.len() != before
            }
        }
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(&self.doc).context("serialize manifest")
    }

    /// Write the manifest back through a temporary file and rename.
    pub fn save(&self) -> anyhow::Result<()> {
        let contents = self.to_yaml()?;
        let tmp = Utf8PathBuf::from(format!("{}.desourcify.tmp", self.path));
        fs::write(&tmp, contents.as_bytes()).with_context(|| format!("write {}", tmp))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path))?;
        debug!("wrote {}", self.path);
        Ok(())
    }

    fn rosinstall_items(&self) -> &[Value] {
        match &self.doc {
            Value::Sequence(items) => items,
            _ => &[],
        }
    }

    fn repositories(&self) -> Option<&Mapping> {
        self.doc.get("repositories")?.as_mapping()
    }
}

fn rosinstall_entry(item: &Value) -> Option<ManifestEntry> {
    // `- git: {local-name: ..., uri: ..., version: ...}`
    let (_, spec) = item.as_mapping()?.iter().next()?;
    Some(ManifestEntry {
        local_name: normalize_local_name(spec.get("local-name")?.as_str()?),
        uri: str_field(spec, "uri"),
        version: str_field(spec, "version"),
    })
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)?.as_str().map(str::to_string)
}

fn normalize_local_name(name: &str) -> String {
    let mut s = name.trim();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.trim_end_matches('/').to_string()
}

/// Default manifest location: `<src_dir>/.rosinstall`, else the first `*.repos`
/// file in the workspace root.
pub fn discover_manifest(workspace_root: &Utf8Path, src_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let rosinstall = workspace_root.join(src_dir).join(".rosinstall");
    if rosinstall.is_file() {
        return Some(rosinstall);
    }

    let mut repos: Vec<Utf8PathBuf> = fs::read_dir(workspace_root)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|e| Utf8PathBuf::from_path_buf(e.path()).ok())
        .filter(|p| p.extension() == Some("repos") && p.is_file())
        .collect();
    repos.sort();
    repos.into_iter().next()
}

/// Path of `checkout` (relative to the workspace root) as the manifest names it.
///
/// `None` when the checkout does not live below the manifest's directory.
pub fn manifest_key(
    workspace_root: &Utf8Path,
    manifest: &SourceManifest,
    checkout: &Utf8Path,
) -> Option<String> {
    let base = abs_path(workspace_root, manifest.base_dir());
    let checkout = abs_path(workspace_root, checkout);
    let rel = checkout.strip_prefix(&base).ok()?;
    let key = normalize_local_name(rel.as_str());
    if key.is_empty() { None } else { Some(key) }
}

/// The manifest entry naming `checkout`, if any.
///
/// Keys relative to the manifest's directory are tried first, then keys
/// relative to the source directory (vcstool files imported into `src_dir`).
pub fn find_manifest_key(
    workspace_root: &Utf8Path,
    manifest: &SourceManifest,
    src_dir: &Utf8Path,
    checkout: &Utf8Path,
) -> Option<String> {
    let src = abs_path(workspace_root, src_dir);
    let from_src = abs_path(workspace_root, checkout)
        .strip_prefix(&src)
        .ok()
        .map(|rel| normalize_local_name(rel.as_str()))
        .filter(|k| !k.is_empty());

    manifest_key(workspace_root, manifest, checkout)
        .into_iter()
        .chain(from_src)
        .find(|key| manifest.contains(key))
}

pub(crate) fn abs_path(root: &Utf8Path, rel: &Utf8Path) -> Utf8PathBuf {
    if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROSINSTALL: &str = r#"
- git:
    local-name: hector_gazebo
    uri: https://github.com/tu-darmstadt-ros-pkg/hector_gazebo.git
    version: noetic-devel
- git:
    local-name: ./drivers/lidar/
    uri: git@github.com:org/lidar.git
    version: main
- setup-file:
    local-name: /opt/ros/noetic/setup.sh
"#;

    const REPOS: &str = r#"
repositories:
  hector_gazebo:
    type: git
    url: https://github.com/tu-darmstadt-ros-pkg/hector_gazebo.git
    version: noetic-devel
  drivers/lidar:
    type: git
    url: git@github.com:org/lidar.git
    version: main
"#;

    #[test]
    fn parses_rosinstall_entries() {
        let m = SourceManifest::parse("src/.rosinstall".into(), ROSINSTALL).expect("parse");
        assert_eq!(m.format(), ManifestFormat::Rosinstall);
        let names: Vec<String> = m.entries().into_iter().map(|e| e.local_name).collect();
        assert_eq!(
            names,
            vec!["hector_gazebo", "drivers/lidar", "/opt/ros/noetic/setup.sh"]
        );
        assert_eq!(
            m.entries()[1].uri.as_deref(),
            Some("git@github.com:org/lidar.git")
        );
    }

    #[test]
    fn removes_rosinstall_entry_by_normalized_name() {
        let mut m = SourceManifest::parse("src/.rosinstall".into(), ROSINSTALL).expect("parse");
        assert!(m.remove("drivers/lidar"));
        assert!(!m.contains("drivers/lidar"));
        assert!(m.contains("hector_gazebo"));
        assert!(!m.remove("drivers/lidar"));

        let reparsed = SourceManifest::parse("src/.rosinstall".into(), &m.to_yaml().unwrap())
            .expect("reparse");
        assert_eq!(reparsed.entries().len(), 2);
    }

    #[test]
    fn removes_repos_entry() {
        let mut m = SourceManifest::parse("ws.repos".into(), REPOS).expect("parse");
        assert_eq!(m.format(), ManifestFormat::Repos);
        assert!(m.remove("./hector_gazebo/"));
        let names: Vec<String> = m.entries().into_iter().map(|e| e.local_name).collect();
        assert_eq!(names, vec!["drivers/lidar"]);
    }

    #[test]
    fn empty_files_pick_format_from_extension() {
        let m = SourceManifest::parse("ws.repos".into(), "").expect("parse");
        assert_eq!(m.format(), ManifestFormat::Repos);
        let m = SourceManifest::parse("src/.rosinstall".into(), "\n").expect("parse");
        assert_eq!(m.format(), ManifestFormat::Rosinstall);
        assert!(m.entries().is_empty());
    }

    #[test]
    fn rejects_unknown_layout() {
        let err = SourceManifest::parse("x.yaml".into(), "foo: bar\n").expect_err("layout");
        assert!(err.to_string().contains("unrecognized manifest"));
    }

    #[test]
    fn manifest_key_is_relative_to_manifest_dir() {
        let m = SourceManifest::parse("src/.rosinstall".into(), ROSINSTALL).expect("parse");
        let root = Utf8Path::new("/ws");
        assert_eq!(
            manifest_key(root, &m, Utf8Path::new("src/drivers/lidar")),
            Some("drivers/lidar".to_string())
        );
        assert_eq!(manifest_key(root, &m, Utf8Path::new("other/repo")), None);
        assert_eq!(manifest_key(root, &m, Utf8Path::new("src")), None);
    }

    #[test]
    fn root_repos_file_keys_resolve_against_src_dir() {
        let m = SourceManifest::parse("/ws/ws.repos".into(), REPOS).expect("parse");
        let root = Utf8Path::new("/ws");
        let src = Utf8Path::new("src");
        assert_eq!(
            find_manifest_key(root, &m, src, Utf8Path::new("src/drivers/lidar")),
            Some("drivers/lidar".to_string())
        );
        assert_eq!(
            find_manifest_key(root, &m, src, Utf8Path::new("src/unlisted")),
            None
        );
    }

    #[test]
    fn manifest_relative_key_wins_when_listed() {
        let m = SourceManifest::parse("src/.rosinstall".into(), ROSINSTALL).expect("parse");
        assert_eq!(
            find_manifest_key(
                Utf8Path::new("/ws"),
                &m,
                Utf8Path::new("src"),
                Utf8Path::new("src/hector_gazebo")
            ),
            Some("hector_gazebo".to_string())
        );
    }
}
