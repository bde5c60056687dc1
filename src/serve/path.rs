//! Fallback URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a URL under `root`, handling `index.html` for directories.
///
/// Paths that escape `root` (through `..` or symlinks) resolve to `None`.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|part| part == "..") {
        return None;
    }

    let canonical = root.join(&clean).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Decode, strip query string, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_file_and_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("robots.txt"), "").unwrap();
        fs::write(dir.path().join("docs/index.html"), "").unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolve_path("/robots.txt?x=1", dir.path()), Some(root.join("robots.txt")));
        assert_eq!(resolve_path("/docs/", dir.path()), Some(root.join("docs/index.html")));
        assert_eq!(resolve_path("/missing.txt", dir.path()), None);
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("public");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("secret.txt"), "").unwrap();

        assert_eq!(resolve_path("/../secret.txt", &root), None);
        assert_eq!(resolve_path("/%2e%2e/secret.txt", &root), None);
    }
}
