//! Known item names and correction of OCR text against them.

pub mod fixes;
pub mod matcher;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::ocr::TileReadResult;
use fixes::apply_fixes;
use matcher::best_match;

/// Minimum fuzzy score (0-100) for a catalog match.
pub const MATCH_THRESHOLD: f64 = 75.0;

/// Texts shorter than this are never corrected or accepted.
pub const MIN_TEXT_LEN: usize = 4;

/// Tooltip text after this marker is not part of the name.
const VOLUME_MARKER: &str = "Volume:";

const ITEM_NAMES_QUERY: &str = "SELECT name FROM items WHERE name IS NOT NULL AND trim(name) != ''";

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    names: Vec<String>,
    lowered: Vec<String>,
}

impl Catalog {
    /// Builds a catalog from names. Blank names are dropped, the rest
    /// trimmed, deduplicated and sorted.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        let lowered = names.iter().map(|n| n.to_lowercase()).collect();
        Self { names, lowered }
    }

    /// Reads item names from the `items` table of an SQLite database.
    pub fn load_from_db(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open catalog database {}", path.display()))?;
        let mut stmt = conn
            .prepare(ITEM_NAMES_QUERY)
            .context("Failed to query item names")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()
            .context("Failed to read item names")?;
        Ok(Self::from_names(names))
    }

    /// Reads one item name per line.
    pub fn load_from_text(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Ok(Self::from_names(content.lines()))
    }

    /// Loads by extension (`.db`/`.sqlite` or text). A missing or unreadable
    /// catalog yields an empty one, which passes OCR text through.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            crate::log(&format!(
                "[WARNING] Catalog not found at {} - OCR text will not be corrected",
                path.display()
            ));
            return Self::default();
        }

        let is_db = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("db") || e.eq_ignore_ascii_case("sqlite"));
        let loaded = if is_db {
            Self::load_from_db(path)
        } else {
            Self::load_from_text(path)
        };

        match loaded {
            Ok(catalog) => {
                crate::log(&format!(
                    "[DB] {} items loaded from {}",
                    catalog.len(),
                    path.display()
                ));
                catalog
            }
            Err(e) => {
                crate::log(&format!("[WARNING] Could not load catalog: {:#}", e));
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    /// Maps OCR text to a catalog name, or an empty string when nothing is
    /// close enough. Short texts and an empty catalog pass through trimmed.
    pub fn correct_name(&self, text: &str) -> String {
        if text.chars().count() < MIN_TEXT_LEN || self.is_empty() {
            return text.trim().to_string();
        }

        let fixed = apply_fixes(text);
        match best_match(&fixed.to_lowercase(), &self.lowered) {
            Some((index, score)) if score >= MATCH_THRESHOLD => self.names[index].clone(),
            _ => String::new(),
        }
    }

    /// Full tooltip correction: truncation, name correction and acceptance.
    pub fn correct(&self, ocr_text: &str) -> TileReadResult {
        let raw_text = truncate_at_volume(ocr_text).to_string();
        let corrected = self.correct_name(&raw_text);

        if is_acceptable(&corrected) {
            let matched = self.contains(&corrected);
            TileReadResult {
                corrected_text: corrected,
                raw_text,
                matched,
            }
        } else {
            TileReadResult {
                corrected_text: String::new(),
                raw_text,
                matched: false,
            }
        }
    }
}

/// Drops the "Volume:" line and everything after it.
pub fn truncate_at_volume(text: &str) -> &str {
    let text = text.trim();
    match text.find(VOLUME_MARKER) {
        Some(pos) => text[..pos].trim(),
        None => text,
    }
}

/// At least `MIN_TEXT_LEN` characters and not starting with a digit.
fn is_acceptable(text: &str) -> bool {
    text.chars().count() >= MIN_TEXT_LEN
        && text.chars().next().is_some_and(|c| !c.is_numeric())
}
