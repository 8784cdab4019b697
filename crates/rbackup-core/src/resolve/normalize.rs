//! Path normalization for `root_dir` and remote directories.

/// Strip trailing slashes so string concatenation with `/` is unambiguous.
/// Idempotent.
pub fn strip_trailing_slashes(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// Normalize a remote directory path; `None` when the result is not a backup
/// target (empty, `.` or `..`).
pub fn normalize_path(path: &str) -> Option<String> {
    let p = strip_trailing_slashes(path);
    match p {
        "" | "." | ".." => None,
        _ => Some(p.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slashes() {
        assert_eq!(normalize_path("/var/www/").as_deref(), Some("/var/www"));
        assert_eq!(normalize_path("/var/www//").as_deref(), Some("/var/www"));
        assert_eq!(normalize_path("data").as_deref(), Some("data"));
    }

    #[test]
    fn rejects_non_targets() {
        for p in ["", ".", "..", "./", "../", "/", "//"] {
            assert_eq!(normalize_path(p), None, "{p:?} should be rejected");
        }
    }

    #[test]
    fn keeps_dot_prefixed_names() {
        assert_eq!(normalize_path(".config").as_deref(), Some(".config"));
        assert_eq!(normalize_path("/home/u/...").as_deref(), Some("/home/u/..."));
    }

    #[test]
    fn normalization_is_idempotent() {
        for p in ["/var/www", "/var/www/", "a//", "/srv/x.y/", "rel"] {
            let once = normalize_path(p).unwrap();
            assert_eq!(normalize_path(&once).as_deref(), Some(once.as_str()));
        }
        assert_eq!(strip_trailing_slashes(strip_trailing_slashes("/a//")), "/a");
    }
}
