#[cfg(test)]
#[path = "mode_test.rs"]
mod tests;

use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

/// Top-level operation selector: create a new image, or transform an
/// existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

/// Aspect ratios accepted by the upstream image models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
pub enum AspectRatio {
    #[strum(serialize = "1:1")]
    Square,
    #[strum(serialize = "9:16")]
    Portrait,
    #[strum(serialize = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub fn parse(text: String) -> Option<AspectRatio> {
        return AspectRatio::iter().find(|e| return e.to_string() == text);
    }
}
