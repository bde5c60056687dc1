//! Logical asset paths and versioned URL construction.
//!
//! A logical path is the caller-facing name of an asset (`dir1/abc.jpg`),
//! independent of where its bytes came from. It is always relative, uses
//! `/` separators, and never starts with a separator.

use std::fmt;
use std::path::{Component, Path};

/// Normalized, relative, `/`-separated asset path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Normalize a caller-supplied path.
    ///
    /// Backslashes become `/`, leading separators are stripped and `.`
    /// and `..` segments are resolved, so `img.jpg`, `/img.jpg` and
    /// `./a/../img.jpg` name the same asset. `..` never climbs above the
    /// root.
    pub fn new(raw: &str) -> Self {
        let unified = raw.replace('\\', "/");
        let mut parts: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                part => parts.push(part),
            }
        }
        Self(parts.join("/"))
    }

    /// Build from a path relative to a scan root.
    pub fn from_relative(rel: &Path) -> Self {
        let parts: Vec<_> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        Self(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (`dir1/abc.jpg` -> `abc.jpg`).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension (`abc.jpg` -> `abc`).
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match ext_dot(name) {
            Some(dot) => &name[..dot],
            None => name,
        }
    }

    /// Extension including the leading dot (`.jpg`), if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        ext_dot(name).map(|dot| &name[dot..])
    }

    /// Replace (or add) the extension. `ext` carries its leading dot;
    /// an empty `ext` removes the extension.
    pub fn with_extension(&self, ext: &str) -> Self {
        let name = self.file_name();
        let dir_len = self.0.len() - name.len();
        let mut out = String::with_capacity(self.0.len() + ext.len());
        out.push_str(&self.0[..dir_len]);
        out.push_str(self.stem());
        out.push_str(ext);
        Self(out)
    }
}

/// Byte offset of the extension dot in a file name.
///
/// A leading dot (`.htaccess`) does not start an extension.
fn ext_dot(name: &str) -> Option<usize> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(dot) => Some(dot),
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Join a URL root and a versioned key.
///
/// The root may or may not end with `/`; both produce the same URL.
pub fn versioned_url(url_root: &str, key: &str) -> String {
    let root = url_root.trim_end_matches('/');
    format!("{root}/{key}")
}
