//! Build stage state machine.
//!
//! ```text
//! Images ──► Scripts ──► Styles ──► Done
//! ```
//!
//! Styles come last because the style rewriter reads committed image records.

use crate::asset::AssetClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Images,
    Scripts,
    Styles,
    Done,
}

impl Stage {
    pub const fn first() -> Self {
        Self::Images
    }

    /// Asset class processed in this stage; `None` once done.
    pub const fn class(self) -> Option<AssetClass> {
        match self {
            Self::Images => Some(AssetClass::Image),
            Self::Scripts => Some(AssetClass::Script),
            Self::Styles => Some(AssetClass::Style),
            Self::Done => None,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Images => Self::Scripts,
            Self::Scripts => Self::Styles,
            Self::Styles | Self::Done => Self::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_class_order() {
        let mut stage = Stage::first();
        let mut classes = Vec::new();
        while let Some(class) = stage.class() {
            classes.push(class);
            stage = stage.next();
        }
        assert_eq!(classes, AssetClass::ALL);
        assert_eq!(stage, Stage::Done);
        assert_eq!(Stage::Done.next(), Stage::Done);
    }
}
