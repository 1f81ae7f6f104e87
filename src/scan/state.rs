//! Scan phases, progress counters and the per-tile retry policy.

use crate::ocr::TileReadResult;

/// Scan state machine phases.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPhase {
    /// Not started
    Idle,
    /// Scrolling the list back to its first row
    ResettingToTop,
    /// Reading the tiles of one block
    ScanningBlock,
    /// Dragging the scrollbar thumb to the next block
    Scrolling,
    /// Nudging down and reading the bottom row
    ScanningLastRow,
    /// Probing and clicking the next-page button
    RequestingNextPage,
    /// Inventory exhausted
    Completed,
    /// User requested abort
    Aborted,
    /// Unrecoverable failure
    Error(String),
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "Idle"),
            ScanPhase::ResettingToTop => write!(f, "Resetting to top"),
            ScanPhase::ScanningBlock => write!(f, "Scanning block"),
            ScanPhase::Scrolling => write!(f, "Scrolling"),
            ScanPhase::ScanningLastRow => write!(f, "Scanning last row"),
            ScanPhase::RequestingNextPage => write!(f, "Requesting next page"),
            ScanPhase::Completed => write!(f, "Completed"),
            ScanPhase::Aborted => write!(f, "Aborted"),
            ScanPhase::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Progress of the running scan. Rows and columns are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    pub phase: ScanPhase,
    pub current_page: u32,
    pub current_block: u32,
    pub current_row: u32,
    pub current_column: u32,
    /// Set once a scrollbar reading succeeds on the current page
    pub estimated_total_rows: Option<f64>,
    /// Last dynamic drag distance, used to size the last-row nudge
    pub last_block_scroll_px: Option<i32>,
    pub drift_correction_px: i32,
    pub active: bool,
    pub empty_streak: u32,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            phase: ScanPhase::Idle,
            current_page: 0,
            current_block: 0,
            current_row: 0,
            current_column: 0,
            estimated_total_rows: None,
            last_block_scroll_px: None,
            drift_correction_px: 0,
            active: false,
            empty_streak: 0,
        }
    }
}

impl ScanState {
    /// Resets the per-page counters. Aggregated results live elsewhere.
    pub fn start_page(&mut self) {
        self.current_page += 1;
        self.current_block = 0;
        self.current_row = 0;
        self.current_column = 0;
        self.estimated_total_rows = None;
        self.last_block_scroll_px = None;
        self.drift_correction_px = 0;
    }

    /// Estimated rows rounded up.
    pub fn estimated_rows(&self) -> Option<u32> {
        self.estimated_total_rows
            .map(|rows| rows.ceil().max(0.0) as u32)
    }

    pub fn position(&self) -> TilePosition {
        TilePosition {
            page: self.current_page,
            row: self.current_row,
            col: self.current_column,
        }
    }
}

/// Where a tile was seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TilePosition {
    pub page: u32,
    pub row: u32,
    pub col: u32,
}

impl TilePosition {
    pub fn new(page: u32, row: u32, col: u32) -> Self {
        Self { page, row, col }
    }
}

impl std::fmt::Display for TilePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Page {}, Row {}, Col {}", self.page, self.row, self.col)
    }
}

/// Final classification of one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    /// Resolved name: a catalog entry, or the cleaned text when no catalog is loaded
    Matched(String),
    /// OCR produced text that did not resolve to a catalog name
    Unmatched(String),
    /// No tooltip text at all
    Empty,
}

/// Decision after one read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    Retry,
    Done(TileOutcome),
}

/// Read attempts for a single tile.
///
/// Two attempts by default. An attempt that produced raw text without a
/// usable name raises the budget to five, since the tooltip is visible and
/// only needs a cleaner capture.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    attempts: u32,
    extended: bool,
    last_raw: Option<String>,
}

impl RetryPolicy {
    pub const INITIAL_BUDGET: u32 = 2;
    pub const EXTENDED_BUDGET: u32 = 5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn budget(&self) -> u32 {
        if self.extended {
            Self::EXTENDED_BUDGET
        } else {
            Self::INITIAL_BUDGET
        }
    }

    /// Records one read and decides whether to try again.
    pub fn observe(&mut self, read: &TileReadResult) -> RetryStep {
        self.attempts += 1;

        let corrected = read.corrected_text.trim();
        if !corrected.is_empty() {
            return RetryStep::Done(TileOutcome::Matched(corrected.to_string()));
        }

        let raw = read.raw_text.trim();
        if !raw.is_empty() {
            self.last_raw = Some(raw.to_string());
            self.extended = true;
        }

        if self.attempts < self.budget() {
            return RetryStep::Retry;
        }

        match self.last_raw.take() {
            Some(raw) => RetryStep::Done(TileOutcome::Unmatched(raw)),
            None => RetryStep::Done(TileOutcome::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(corrected: &str, raw: &str, matched: bool) -> TileReadResult {
        TileReadResult {
            corrected_text: corrected.to_string(),
            raw_text: raw.to_string(),
            matched,
        }
    }

    fn run(reads: &[TileReadResult]) -> (TileOutcome, u32) {
        let mut policy = RetryPolicy::new();
        for r in reads {
            if let RetryStep::Done(outcome) = policy.observe(r) {
                return (outcome, policy.attempts());
            }
        }
        panic!("policy wanted more than {} reads", reads.len());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(format!("{}", ScanPhase::Idle), "Idle");
        assert_eq!(format!("{}", ScanPhase::ScanningLastRow), "Scanning last row");
        assert_eq!(
            format!("{}", ScanPhase::Error("window lost".to_string())),
            "Error: window lost"
        );
    }

    #[test]
    fn test_matched_on_first_attempt() {
        let (outcome, attempts) = run(&[read("Oracle Helmet", "0racle Helmet", true)]);
        assert_eq!(outcome, TileOutcome::Matched("Oracle Helmet".to_string()));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_two_empty_reads_are_empty() {
        let (outcome, attempts) = run(&[read("", "", false), read("", "", false)]);
        assert_eq!(outcome, TileOutcome::Empty);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_unmatched_raw_extends_to_five() {
        let unmatched = read("", "Xqzv Hlmt", false);
        let (outcome, attempts) = run(&vec![unmatched; 5]);
        assert_eq!(outcome, TileOutcome::Unmatched("Xqzv Hlmt".to_string()));
        assert_eq!(attempts, 5);
    }

    #[test]
    fn test_empty_then_matched() {
        let (outcome, attempts) = run(&[read("", "", false), read("Paladin Helmet", "Paladin Helmet", true)]);
        assert_eq!(outcome, TileOutcome::Matched("Paladin Helmet".to_string()));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_extension_then_match() {
        let (outcome, attempts) = run(&[
            read("", "", false),
            read("", "Orc-m Helm", false),
            read("", "", false),
            read("ORC-mkX Helmet Arctic", "ORC-mkX Helmet Arctic", true),
        ]);
        assert_eq!(
            outcome,
            TileOutcome::Matched("ORC-mkX Helmet Arctic".to_string())
        );
        assert_eq!(attempts, 4);
    }

    #[test]
    fn test_uncatalogued_text_is_accepted() {
        // without a catalog the reader passes accepted text through unmatched
        let (outcome, attempts) = run(&[read("Some Helmet", "Some Helmet", false)]);
        assert_eq!(outcome, TileOutcome::Matched("Some Helmet".to_string()));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_last_raw_text_is_reported() {
        let (outcome, _) = run(&[
            read("", "first", false),
            read("", "second", false),
            read("", "", false),
            read("", "", false),
            read("", "", false),
        ]);
        assert_eq!(outcome, TileOutcome::Unmatched("second".to_string()));
    }

    #[test]
    fn test_state_estimate_rounds_up() {
        let mut state = ScanState::default();
        assert_eq!(state.estimated_rows(), None);
        state.estimated_total_rows = Some(24.96);
        assert_eq!(state.estimated_rows(), Some(25));
        state.start_page();
        assert_eq!(state.current_page, 1);
        assert_eq!(state.estimated_rows(), None);
    }
}
