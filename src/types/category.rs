//! The closed set of measurement categories reported by the environmental API.

use std::fmt;

/// A measurement category tracked by the fetcher and the cache.
///
/// Upstream records carry the category as a free-form label in `itemengname`.
/// [`Category::from_label`] is the only place those labels are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Fine particulate matter (PM2.5), μg/m³.
    Pm25,
    /// Ambient temperature, °C.
    Temperature,
    /// Relative humidity, %.
    Humidity,
}

/// Upstream label → category.
const LABELS: &[(&str, Category)] = &[
    ("PM2.5", Category::Pm25),
    ("AMB_TEMP", Category::Temperature),
    ("RH", Category::Humidity),
];

impl Category {
    /// Categories persisted by the supplementary data cache.
    pub const SUPPLEMENTARY: [Category; 2] = [Category::Temperature, Category::Humidity];

    /// Maps an upstream `itemengname` label to a category. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Category> {
        LABELS
            .iter()
            .find(|(known, _)| *known == label.trim())
            .map(|(_, category)| *category)
    }

    /// The upstream label for this category.
    pub fn label(&self) -> &'static str {
        LABELS
            .iter()
            .find(|(_, category)| category == self)
            .map(|(label, _)| *label)
            .unwrap_or_default()
    }

    /// Name of the value field in cache files and plot artifacts.
    pub fn value_field(&self) -> &'static str {
        match self {
            Category::Pm25 => "pm25",
            Category::Temperature => "temperature",
            Category::Humidity => "humidity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value_field())
    }
}
