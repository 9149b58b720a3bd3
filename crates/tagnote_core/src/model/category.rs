//! Closed set of annotation categories.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Category assigned to an annotated span at creation time.
///
/// Categories never change on an existing span. Re-categorizing is a
/// delete of the old span plus a create of a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Something that went wrong or blocks progress.
    Problem,
    /// A proposal worth following up on.
    Idea,
    /// How a problem was (or will be) solved.
    Solution,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Category::Problem, Category::Idea, Category::Solution];

    /// Stable lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::Idea => "idea",
            Self::Solution => "solution",
        }
    }

    /// Fixed highlight color painted behind spans of this category.
    pub fn display_color(self) -> Rgba {
        match self {
            Self::Problem => Rgba::new(0xFF, 0xEC, 0x5E, HIGHLIGHT_ALPHA),
            Self::Idea => Rgba::new(0xFF, 0x83, 0xCD, HIGHLIGHT_ALPHA),
            Self::Solution => Rgba::new(0x89, 0xF3, 0xFF, HIGHLIGHT_ALPHA),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// 0.7 opacity.
const HIGHLIGHT_ALPHA: u8 = 179;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// `#RRGGBBAA` notation.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Rgba};

    #[test]
    fn colors_are_distinct_and_translucent() {
        let colors: Vec<Rgba> = Category::ALL.iter().map(|c| c.display_color()).collect();
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert!(colors.iter().all(|c| c.a > 0 && c.a < 0xFF));
        assert_eq!(Category::Problem.display_color().to_hex(), "#FFEC5EB3");
    }

    #[test]
    fn serializes_as_screaming_case() {
        let json = serde_json::to_string(&Category::Solution).unwrap();
        assert_eq!(json, "\"SOLUTION\"");
    }
}
