//! Asset class definitions.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of versioned asset.
///
/// The declaration order is the build order: stylesheets may reference
/// images, so images are always committed first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Image,
    Script,
    Style,
}

impl AssetClass {
    /// All classes in build order.
    pub const ALL: [Self; 3] = [Self::Image, Self::Script, Self::Style];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Script => "script",
            Self::Style => "style",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Self::Image),
            "script" | "scripts" | "javascript" | "js" => Ok(Self::Script),
            "style" | "styles" | "css" => Ok(Self::Style),
            _ => Err(ConfigError::UnknownClass(s.to_string())),
        }
    }
}
