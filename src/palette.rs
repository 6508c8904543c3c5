//! The fixed colour table the sphere tints are derived from.
//!
//! The table on disk is a JSON array of five-colour palettes. It is flattened into a single
//! list of colour strings and indexed per grid cell.

use anyhow::{Context, bail};
use serde_json::Value;

use crate::{color, resources::load_string};

const BUILTIN: &str = include_str!("../assets/palettes.json");

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    entries: Vec<String>,
}

impl Palette {
    /// Parse a (possibly nested) JSON array of colour strings and flatten it in order.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(json).context("palette table is not valid JSON")?;
        let mut entries = Vec::new();
        flatten(&value, &mut entries)?;
        Ok(Self { entries })
    }

    /// The table shipped in `assets/palettes.json`, compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN).unwrap_or_else(|e| {
            log::error!("Embedded palette table is broken: {:#}", e);
            Self::default()
        })
    }

    /// Load a table from `assets/`, or return the embedded one when `file` is `None`.
    pub async fn load(file: Option<&str>) -> anyhow::Result<Self> {
        let Some(file) = file else {
            return Ok(Self::builtin());
        };
        let json = load_string(file)
            .await
            .with_context(|| format!("could not read palette table {}", file))?;
        let palette = Self::from_json(&json)?;
        log::info!("Loaded {} palette entries from {}", palette.len(), file);
        Ok(palette)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry used for the sphere at grid cell `(i, j)`.
    pub fn sphere_entry(&self, i: usize, j: usize) -> Option<&str> {
        self.get(j * i + 1)
    }

    /// Linear RGB tint for grid cell `(i, j)`: the hashed colour of its palette entry.
    pub fn sphere_tint(&self, i: usize, j: usize) -> [f32; 3] {
        let entry = match self.sphere_entry(i, j) {
            Some(entry) => entry,
            None => {
                log::warn!(
                    "Palette has {} entries, none for cell ({}, {}). Falling back to the empty string.",
                    self.len(),
                    i,
                    j
                );
                ""
            }
        };
        let hex = color::color_of(entry);
        // color_of always yields six hex digits
        let rgb = color::parse_hex(&hex).unwrap_or([0; 3]);
        color::srgb_to_linear(rgb)
    }
}

fn flatten(value: &Value, out: &mut Vec<String>) -> anyhow::Result<()> {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                flatten(item, out)?;
            }
        }
        other => bail!("unexpected palette entry {}", other),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_100_palettes_of_five() {
        let palette = Palette::builtin();
        assert_eq!(palette.len(), 500);
        assert_eq!(palette.get(0), Some("#69d2e7"));
        assert_eq!(palette.get(1), Some("#a7dbd8"));
    }

    #[test]
    fn flattens_any_depth_in_order() {
        let palette = Palette::from_json(r##"["#000001", [["#000002"], "#000003"], []]"##).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.get(2), Some("#000003"));
    }

    #[test]
    fn rejects_non_string_entries() {
        assert!(Palette::from_json("[1, 2]").is_err());
        assert!(Palette::from_json("{").is_err());
    }

    #[test]
    fn sphere_entries_use_product_index() {
        let palette = Palette::builtin();
        assert_eq!(palette.sphere_entry(0, 7), palette.get(1));
        assert_eq!(palette.sphere_entry(9, 9), palette.get(82));
        assert_eq!(palette.sphere_entry(3, 4), palette.get(13));
    }

    #[test]
    fn tint_is_the_hash_colour_of_the_entry() {
        let palette = Palette::builtin();
        let entry = palette.sphere_entry(2, 3).unwrap();
        let rgb = color::parse_hex(&color::color_of(entry)).unwrap();
        assert_eq!(palette.sphere_tint(2, 3), color::srgb_to_linear(rgb));
    }

    #[test]
    fn missing_entry_falls_back_to_black() {
        let palette = Palette::from_json("[]").unwrap();
        assert!(palette.is_empty());
        assert_eq!(palette.sphere_tint(4, 4), [0.0; 3]);
    }
}
