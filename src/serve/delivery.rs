//! Versioned file lookup for HTTP delivery.
//!
//! Keys are unique per content, so only the last URL segment matters:
//!
//! ```text
//! /assets/v2/abc.629f545a3f7cea350715263cd5ef3012.jpg?x=1
//!            └────────────── key ──────────────┘
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use percent_encoding::percent_decode_str;

use crate::asset::SharedIndex;
use crate::logger::BuildLog;
use crate::utils::mime;

/// Versioned files never change; cache for a year.
pub const MAX_AGE: u32 = 31_536_000;

/// A resolved versioned file with its response metadata.
#[derive(Debug, Clone)]
pub struct Asset {
    pub key: String,
    pub bytes: Arc<[u8]>,
    pub content_type: &'static str,
    pub modified: SystemTime,
}

impl Asset {
    pub fn cache_control() -> String {
        format!("public, max-age={MAX_AGE}")
    }

    /// Response headers, in send order.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("Content-Type", self.content_type.to_string()),
            ("Cache-Control", Self::cache_control()),
            ("Content-Length", self.bytes.len().to_string()),
        ]
    }
}

/// Serves committed records from a caching index.
#[derive(Clone)]
pub struct Delivery {
    index: SharedIndex,
    log: Arc<dyn BuildLog>,
}

impl Delivery {
    pub fn new(index: SharedIndex, log: Arc<dyn BuildLog>) -> Self {
        Self { index, log }
    }

    /// Resolve a request URL. `None` means decline: the caller should try
    /// its next handler.
    pub fn lookup(&self, url: &str) -> Option<Asset> {
        let key = key_from_url(url)?;
        let asset = {
            let index = self.index.read();
            index.get(&key).and_then(|record| {
                Some(Asset {
                    key: record.key.clone(),
                    bytes: record.bytes.clone()?,
                    content_type: mime::from_file_name(&record.file_name),
                    modified: record.modified,
                })
            })
        };

        if asset.is_none() {
            self.log.verbose(&format!("Version miss: {url}"));
        }
        asset
    }
}

/// Last path segment of a request URL, percent-decoded, without query or
/// fragment.
pub fn key_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let last = decoded.rsplit('/').next()?;
    (!last.is_empty()).then(|| last.to_string())
}
