//! Aggregated scan results and their persistence.
//!
//! The results file is rewritten on every flush. The unmatched file is merged
//! with its previous contents so positions collected by earlier runs survive.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::state::TilePosition;

/// Header of the unmatched-text file.
const UNMATCHED_HEADER: &str = "# Items detected by OCR but not matched to database\n\
# These items may need to be added to inventory.db\n\
# Format: Item Name - Page X, Row Y, Col Z; Page X, Row Y, Col Z\n";

/// One position entry; the column is missing in files from older versions.
const POSITION_PATTERN: &str = r"^Page\s*(\d+)\s*,\s*Row\s*(\d+)(?:\s*,\s*Col\s*(\d+))?$";

/// Item counts and unmatched OCR text for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateResults {
    pub counts: BTreeMap<String, u32>,
    pub unmatched: BTreeMap<String, BTreeSet<TilePosition>>,
}

impl AggregateResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence and returns the running count.
    pub fn record_item(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_unmatched(&mut self, raw_text: &str, position: TilePosition) {
        self.unmatched
            .entry(raw_text.to_string())
            .or_default()
            .insert(position);
    }

    pub fn total_items(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn unique_items(&self) -> usize {
        self.counts.len()
    }
}

/// Destination for aggregated results.
pub trait ResultSink {
    fn flush(&mut self, results: &AggregateResults) -> Result<()>;
}

/// Writes the results and unmatched files.
#[derive(Clone, Debug)]
pub struct FileResultSink {
    results_path: PathBuf,
    unmatched_path: PathBuf,
}

impl FileResultSink {
    pub fn new(results_path: PathBuf, unmatched_path: PathBuf) -> Self {
        Self {
            results_path,
            unmatched_path,
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    pub fn unmatched_path(&self) -> &Path {
        &self.unmatched_path
    }
}

impl ResultSink for FileResultSink {
    fn flush(&mut self, results: &AggregateResults) -> Result<()> {
        write_results(&self.results_path, results)?;
        crate::log(&format!(
            "[RESULTS] {} items scanned ({} unique)",
            results.total_items(),
            results.unique_items()
        ));
        crate::log(&format!(
            "[RESULTS] Saved to {}",
            self.results_path.display()
        ));

        if results.unmatched.is_empty() {
            return Ok(());
        }

        let total = merge_unmatched(&self.unmatched_path, &results.unmatched)?;
        crate::log(&format!(
            "[NOT DETECTED] {} new unmatched items ({} total)",
            results.unmatched.len(),
            total
        ));
        crate::log(&format!(
            "[NOT DETECTED] Saved to {}",
            self.unmatched_path.display()
        ));
        Ok(())
    }
}

/// Keeps flushed snapshots in memory.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct MemoryResultSink {
    pub flushes: Vec<AggregateResults>,
}

#[cfg(test)]
impl ResultSink for MemoryResultSink {
    fn flush(&mut self, results: &AggregateResults) -> Result<()> {
        self.flushes.push(results.clone());
        Ok(())
    }
}

/// Writes `"<count>, <name>"` lines sorted by name.
pub fn write_results(path: &Path, results: &AggregateResults) -> Result<()> {
    let mut content = String::new();
    for (name, count) in &results.counts {
        content.push_str(&format!("{}, {}\n", count, name));
    }
    fs::write(path, content)
        .with_context(|| format!("Failed to write results to {}", path.display()))
}

/// Parses one `Page P, Row R, Col C` entry. Entries without a column get 0.
pub fn parse_position(pattern: &Regex, entry: &str) -> Option<TilePosition> {
    let caps = pattern.captures(entry.trim())?;
    let page = caps.get(1)?.as_str().parse().ok()?;
    let row = caps.get(2)?.as_str().parse().ok()?;
    let col = match caps.get(3) {
        Some(c) => c.as_str().parse().ok()?,
        None => 0,
    };
    Some(TilePosition::new(page, row, col))
}

/// Parses an existing unmatched file. Comment and separator lines are skipped.
pub fn parse_unmatched(content: &str) -> Result<BTreeMap<String, BTreeSet<TilePosition>>> {
    let pattern = Regex::new(POSITION_PATTERN)?;
    let mut entries: BTreeMap<String, BTreeSet<TilePosition>> = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("---") {
            continue;
        }

        let parsed = line.split_once(" - ").and_then(|(text, list)| {
            let positions: BTreeSet<TilePosition> =
                list.split(';').filter_map(|e| parse_position(&pattern, e)).collect();
            if positions.is_empty() {
                None
            } else {
                Some((text.trim().to_string(), positions))
            }
        });

        match parsed {
            Some((text, positions)) => entries.entry(text).or_default().extend(positions),
            None => {
                entries.entry(line.to_string()).or_default();
            }
        }
    }

    Ok(entries)
}

/// Renders the unmatched file: header, blank line, one entry per text.
pub fn render_unmatched(entries: &BTreeMap<String, BTreeSet<TilePosition>>) -> String {
    let mut out = String::from(UNMATCHED_HEADER);
    out.push('\n');
    for (text, positions) in entries {
        if positions.is_empty() {
            out.push_str(text);
        } else {
            let list: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
            out.push_str(&format!("{} - {}", text, list.join("; ")));
        }
        out.push('\n');
    }
    out
}

/// Unions new entries into the file and returns the number of distinct texts.
pub fn merge_unmatched(
    path: &Path,
    new_entries: &BTreeMap<String, BTreeSet<TilePosition>>,
) -> Result<usize> {
    let mut merged = if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => parse_unmatched(&content)?,
            Err(e) => {
                crate::log(&format!(
                    "[WARNING] Could not read existing {}: {}",
                    path.display(),
                    e
                ));
                BTreeMap::new()
            }
        }
    } else {
        BTreeMap::new()
    };

    for (text, positions) in new_entries {
        merged
            .entry(text.clone())
            .or_default()
            .extend(positions.iter().copied());
    }

    fs::write(path, render_unmatched(&merged))
        .with_context(|| format!("Failed to write unmatched items to {}", path.display()))?;
    Ok(merged.len())
}
