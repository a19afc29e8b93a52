//! HS2 sector names keyed by code ranges.
//!
//! The data dictionary stores ranges as string keys:
//! ```json
//! {
//!   "hs4_categories": {
//!     "01-05": "Animal & Animal Products",
//!     "84": "Machinery"
//!   }
//! }
//! ```
//! They are parsed once into [`CategoryRange`] entries so lookups never touch
//! the encoded keys again.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRange {
    pub start: u32,
    pub end: u32,
    pub label: String,
}

impl CategoryRange {
    fn contains(&self, hs2: u32) -> bool {
        self.start <= hs2 && hs2 <= self.end
    }
}

#[derive(Deserialize)]
struct DataDictionary {
    #[serde(default)]
    hs4_categories: HashMap<String, String>,
}

/// Ordered table of inclusive HS2 ranges.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    ranges: Vec<CategoryRange>,
}

impl CategoryTable {
    /// Builds a table from range entries, ordering them by `(start, end)`.
    pub fn new(mut ranges: Vec<CategoryRange>) -> Self {
        ranges.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        Self { ranges }
    }

    /// Loads the `hs4_categories` map from a data dictionary document.
    ///
    /// A document without that key yields an empty table. Keys that are not
    /// `NN` or `NN-NN` are skipped.
    pub fn from_dictionary_json(text: &str) -> Result<Self> {
        let dictionary: DataDictionary = serde_json::from_str(text)?;

        let mut ranges = Vec::with_capacity(dictionary.hs4_categories.len());
        for (key, label) in dictionary.hs4_categories {
            match parse_range_key(&key) {
                Some((start, end)) => ranges.push(CategoryRange { start, end, label }),
                None => warn!(key = %key, "Ignoring unparseable category range"),
            }
        }

        debug!(ranges = ranges.len(), "Category table loaded");
        Ok(Self::new(ranges))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the label of the first range containing `hs2`, if any.
    pub fn lookup(&self, hs2: &str) -> Option<&str> {
        let code: u32 = hs2.trim().parse().ok()?;
        self.ranges
            .iter()
            .find(|r| r.contains(code))
            .map(|r| r.label.as_str())
    }

    /// Display name for a sector, falling back to `Category {hs2}`.
    pub fn name_for(&self, hs2: &str) -> String {
        self.lookup(hs2)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Category {hs2}"))
    }
}

fn parse_range_key(key: &str) -> Option<(u32, u32)> {
    let (start, end) = match key.split_once('-') {
        Some((start, end)) => (start.trim().parse().ok()?, end.trim().parse().ok()?),
        None => {
            let single = key.trim().parse().ok()?;
            (single, single)
        }
    };

    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::from_dictionary_json(
            r#"{
                "hs4_categories": {
                    "01-05": "Animal & Animal Products",
                    "84-85": "Machinery / Electrical",
                    "27": "Mineral Fuels",
                    "bogus": "Ignored"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_range_lookup_is_inclusive() {
        let table = table();
        assert_eq!(table.lookup("01"), Some("Animal & Animal Products"));
        assert_eq!(table.lookup("05"), Some("Animal & Animal Products"));
        assert_eq!(table.lookup("85"), Some("Machinery / Electrical"));
    }

    #[test]
    fn test_single_code_key() {
        assert_eq!(table().lookup("27"), Some("Mineral Fuels"));
        assert_eq!(table().lookup("26"), None);
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(table().name_for("99"), "Category 99");
        assert_eq!(table().name_for("84"), "Machinery / Electrical");
    }

    #[test]
    fn test_unparseable_keys_are_dropped() {
        assert_eq!(table().len(), 3);
    }

    #[test]
    fn test_missing_section_is_empty_table() {
        let table = CategoryTable::from_dictionary_json(r#"{"other": 1}"#).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.name_for("01"), "Category 01");
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(CategoryTable::from_dictionary_json("not json").is_err());
    }

    #[test]
    fn test_overlapping_ranges_prefer_lowest_start() {
        let table = CategoryTable::new(vec![
            CategoryRange { start: 10, end: 20, label: "Wide".into() },
            CategoryRange { start: 1, end: 15, label: "Early".into() },
        ]);
        assert_eq!(table.lookup("12"), Some("Early"));
        assert_eq!(table.lookup("18"), Some("Wide"));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert_eq!(parse_range_key("10-05"), None);
        assert_eq!(parse_range_key("06-14"), Some((6, 14)));
    }
}
