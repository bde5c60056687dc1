//! Content hashing for versioned keys.
//!
//! A key is `stem + "." + hex(digest(bytes)) + extension`:
//!
//! ```text
//! dir1/abc.jpg  + bytes  ->  abc.629f545a3f7cea350715263cd5ef3012.jpg
//! dir1/baz.less + bytes  ->  baz.063294d2868a7c8b9653da78840f0963.css   (override ".css")
//! ```
//!
//! The directory part of the logical path never appears in the key.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use super::LogicalPath;

/// Digest used for versioned keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 32 hex chars.
    #[default]
    Md5,
    /// 64 hex chars.
    Blake3,
}

impl HashAlgorithm {
    /// Lowercase hex digest of the exact byte sequence.
    pub fn hex_digest(self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        }
    }
}

/// Extension of the committed asset: the override if any, else the
/// logical path's own extension, else nothing.
pub fn final_extension<'a>(logical: &'a LogicalPath, ext_override: Option<&'a str>) -> &'a str {
    ext_override.or(logical.extension()).unwrap_or("")
}

/// Derive the versioned key for a file.
#[inline]
pub fn derive_key(
    logical: &LogicalPath,
    bytes: &[u8],
    ext_override: Option<&str>,
    algorithm: HashAlgorithm,
) -> String {
    let digest = algorithm.hex_digest(bytes);
    let ext = final_extension(logical, ext_override);
    format!("{}.{}{}", logical.stem(), digest, ext)
}
