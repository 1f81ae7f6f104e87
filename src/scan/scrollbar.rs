//! Scrollbar thumb detection by colour.
//!
//! The thumb is found by sampling the middle column of the captured track and
//! grouping matching rows into runs. The longest run is the thumb.

use image::{Rgba, RgbaImage};

use super::config::{RgbColor, ScanConfig};

/// Runs shorter than this are treated as noise.
pub const MIN_THUMB_HEIGHT: usize = 10;

/// Largest gap between matching rows that still belongs to one run.
pub const MAX_RUN_GAP: u32 = 2;

/// Thumb position, relative to the captured region unless offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollbarReading {
    pub center_y: i32,
    pub bottom_y: i32,
    pub thumb_height: i32,
}

impl ScrollbarReading {
    /// Converts a track-relative reading to screen coordinates.
    pub fn offset(&self, track_top: i32) -> Self {
        Self {
            center_y: self.center_y + track_top,
            bottom_y: self.bottom_y + track_top,
            thumb_height: self.thumb_height,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScrollbarLocator {
    colors: [RgbColor; 2],
    tolerance: u8,
}

impl ScrollbarLocator {
    pub fn new(colors: [RgbColor; 2], tolerance: u8) -> Self {
        Self { colors, tolerance }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            [config.scrollbar_color, config.scrollbar_color_hover],
            config.scroll_color_tolerance,
        )
    }

    fn matches(&self, pixel: &Rgba<u8>) -> bool {
        let tol = self.tolerance;
        self.colors.iter().any(|c| {
            pixel[0].abs_diff(c.r) <= tol
                && pixel[1].abs_diff(c.g) <= tol
                && pixel[2].abs_diff(c.b) <= tol
        })
    }

    /// Row indices whose middle-column pixel matches a thumb colour.
    pub fn matching_rows(&self, img: &RgbaImage) -> Vec<u32> {
        if img.width() == 0 {
            return Vec::new();
        }
        let mid_x = img.width() / 2;
        (0..img.height())
            .filter(|&y| self.matches(img.get_pixel(mid_x, y)))
            .collect()
    }

    /// Locates the thumb. `None` when no run reaches the noise floor.
    pub fn locate(&self, img: &RgbaImage) -> Option<ScrollbarReading> {
        let rows = self.matching_rows(img);
        let run = longest_run(&rows)?;

        if run.len() < MIN_THUMB_HEIGHT {
            crate::log(&format!(
                "  [WARNING] Scrollbar too small: {}px (minimum {}px)",
                run.len(),
                MIN_THUMB_HEIGHT
            ));
            return None;
        }

        let sum: u64 = run.iter().map(|&y| y as u64).sum();
        let center = sum / run.len() as u64;
        let bottom = run[run.len() - 1];

        Some(ScrollbarReading {
            center_y: center as i32,
            bottom_y: bottom as i32,
            thumb_height: run.len() as i32,
        })
    }
}

/// Splits sorted row indices into runs, bridging gaps up to `MAX_RUN_GAP`.
pub fn group_runs(rows: &[u32]) -> Vec<&[u32]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..rows.len() {
        if rows[i] - rows[i - 1] > MAX_RUN_GAP {
            runs.push(&rows[start..i]);
            start = i;
        }
    }
    if !rows.is_empty() {
        runs.push(&rows[start..]);
    }
    runs
}

/// Longest run of matching rows. Earlier runs win ties.
pub fn longest_run(rows: &[u32]) -> Option<&[u32]> {
    let mut best: Option<&[u32]> = None;
    for run in group_runs(rows) {
        if best.is_none_or(|b| run.len() > b.len()) {
            best = Some(run);
        }
    }
    best
}
