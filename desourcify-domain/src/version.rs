/// Resolve the git commit a binary package was built from.
///
/// Build farms stamp the commit into the Debian version as
/// `...-<digits>UTC-<hash>`, e.g. `1.2.0-0focal-20240315123000UTC-3f2a1bc`.
/// The last such stamp wins. Returns `None` for any other version shape.
pub fn commit_from_version(version: &str) -> Option<String> {
    const MARKER: &str = "UTC-";

    let mut search_end = version.len();
    while let Some(idx) = version[..search_end].rfind(MARKER) {
        search_end = idx;

        let before = &version[..idx];
        let digits = before.len() - before.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let stamped = digits > 0 && before[..before.len() - digits].ends_with('-');
        if !stamped {
            continue;
        }

        let hash: String = version[idx + MARKER.len()..]
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect();
        if !hash.is_empty() {
            return Some(hash);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_stamped_commit() {
        assert_eq!(
            commit_from_version("1.2.0-0focal-20240315123000UTC-3f2a1bc"),
            Some("3f2a1bc".to_string())
        );
    }

    #[test]
    fn stops_at_debian_revision_suffix() {
        assert_eq!(
            commit_from_version("0.3.1-1-20231201UTC-deadbeef-1"),
            Some("deadbeef".to_string())
        );
    }

    #[test]
    fn last_stamp_wins() {
        assert_eq!(
            commit_from_version("1-1UTC-aaaa-2UTC-bbbb"),
            Some("bbbb".to_string())
        );
    }

    #[test]
    fn unstamped_versions_are_none() {
        assert_eq!(commit_from_version("1.15.9-1focal.20230627.162617"), None);
        assert_eq!(commit_from_version("1.0.0-UTC-abc"), None);
        assert_eq!(commit_from_version("1.0.0-123UTC-"), None);
        assert_eq!(commit_from_version(""), None);
    }
}
