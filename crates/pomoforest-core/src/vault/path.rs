//! Vault-relative path helpers. Vault paths always use `/`.

/// Normalize a user-supplied path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and a leading
/// `/` is kept.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let joined = parts.join("/");
    if path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Join segments and normalize the result.
///
/// Empty segments are skipped, so an empty folder does not turn the result
/// into an absolute path.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let raw: Vec<&str> = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|segment| !segment.is_empty())
        .collect();
    normalize(&raw.join("/"))
}

/// Every folder above `path`, outermost first.
///
/// `a/b/log.md` yields `["a", "a/b"]`.
pub fn ancestors(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let absolute = normalized.starts_with('/');
    let parts: Vec<&str> = normalized.trim_start_matches('/').split('/').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    (1..parts.len())
        .map(|end| {
            let folder = parts[..end].join("/");
            if absolute {
                format!("/{folder}")
            } else {
                folder
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_noise_segments() {
        assert_eq!(normalize("a//b/./c.md"), "a/b/c.md");
        assert_eq!(normalize("a\\b\\c.md"), "a/b/c.md");
        assert_eq!(normalize("/logs/pomodoro.md"), "/logs/pomodoro.md");
        assert_eq!(normalize("./"), "");
    }

    #[test]
    fn join_merges_segments() {
        assert_eq!(join(&["journal/", "/2024", "x.md"]), "journal/2024/x.md");
        assert_eq!(join(&["", "x.md"]), "x.md");
        assert_eq!(join(&["", "", "a", "x.md"]), "a/x.md");
        assert_eq!(join(&["/abs", "x.md"]), "/abs/x.md");
    }

    #[test]
    fn ancestors_outermost_first() {
        assert_eq!(ancestors("a/b/log.md"), vec!["a".to_string(), "a/b".to_string()]);
        assert_eq!(ancestors("/a/log.md"), vec!["/a".to_string()]);
        assert!(ancestors("log.md").is_empty());
    }
}
