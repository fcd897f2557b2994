//! Homepage field parsing and git URL normalization.

/// A binary package homepage of the form `<git-url>#<branch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homepage {
    pub url: String,
    pub branch: String,
}

/// Parse `<url>#<branch>`, splitting at the last `#`.
///
/// Both sides must be non-empty and the branch must not contain whitespace.
pub fn parse_homepage(raw: &str) -> Option<Homepage> {
    let (url, branch) = raw.trim().rsplit_once('#')?;
    let url = url.trim();
    let branch = branch.trim();
    if url.is_empty() || branch.is_empty() || branch.contains(char::is_whitespace) {
        return None;
    }
    Some(Homepage {
        url: url.to_string(),
        branch: branch.to_string(),
    })
}

/// Reduce a git remote URL to `host/path` so that https, ssh and scp-style
/// remotes of the same repository compare equal.
///
/// Strips scheme, user info, port, trailing slashes and a `.git` suffix, and
/// lowercases the result.
pub fn normalize_git_url(url: &str) -> String {
    let mut s = url.trim();

    let had_scheme = match s.find("://") {
        Some(idx) => {
            s = &s[idx + 3..];
            true
        }
        None => false,
    };

    // user@host
    let slash = s.find('/').unwrap_or(s.len());
    if let Some(at) = s[..slash].rfind('@') {
        s = &s[at + 1..];
    }

    let (host, path) = match s.find(['/', ':']) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    };

    let path = if let Some(rest) = path.strip_prefix(':') {
        if had_scheme {
            // host:port/path
            match rest.find('/') {
                Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_digit()) => &rest[idx..],
                _ => rest,
            }
        } else {
            // scp-style host:path
            rest
        }
    } else {
        path
    };

    let mut path = path.trim_matches('/');
    loop {
        let before = path;
        path = path.strip_suffix(".git").unwrap_or(path).trim_end_matches('/');
        if before == path {
            break;
        }
    }

    let joined = if path.is_empty() {
        host.to_string()
    } else {
        format!("{host}/{path}")
    };
    joined.to_ascii_lowercase()
}
