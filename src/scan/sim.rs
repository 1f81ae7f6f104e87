//! In-memory inventory used to drive the orchestrator in tests.
//!
//! Models the 1920x1080 layout: a grid of 4 columns with 8 visible rows, a
//! scrollbar thumb sized by the row count, drags that move the list with the
//! same px-per-row relationship the game has, and a next-page button that is
//! lit while another page exists.

use anyhow::{Result, anyhow};
use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use super::cancel::CancelToken;
use super::desktop::{Desktop, ScreenRect};
use super::geometry::GeometryProfile;
use super::scroll_math::correction_factor;
use crate::ocr::{TileReadResult, TileTextReader};

const COLUMNS: u32 = 4;
const VISIBLE_ROWS: u32 = 8;
const THUMB: Rgba<u8> = Rgba([17, 103, 120, 255]);
const TRACK: Rgba<u8> = Rgba([40, 40, 40, 255]);
const BUTTON_LIT: u8 = 75;
const BUTTON_DARK: u8 = 30;

pub struct SimState {
    geometry: GeometryProfile,
    pages: Vec<Vec<Option<String>>>,
    pub page: usize,
    pub top_row: u32,
    pub pointer: (i32, i32),
    pub reads: usize,
    pub captures: usize,
    pub drags: Vec<i32>,
    pub clicks: Vec<(i32, i32)>,
    pub abort_on_read: Option<(usize, CancelToken)>,
    pub fail_capture_after: Option<usize>,
    pub scripted: VecDeque<TileReadResult>,
    /// Cancelled when the next-page button is captured
    pub abort_on_button_probe: Option<CancelToken>,
    /// Actions are logged to `after_cancel` once this token is cancelled
    pub watch: Option<CancelToken>,
    pub after_cancel: Vec<String>,
    /// The wheel does not move the list
    pub wheel_ignored: bool,
}

impl SimState {
    fn rows(&self) -> u32 {
        let tiles = self.pages.get(self.page).map_or(0, |p| p.len()) as u32;
        tiles.div_ceil(COLUMNS)
    }

    fn invisible_rows(&self) -> u32 {
        self.rows().saturating_sub(VISIBLE_ROWS)
    }

    /// Thumb top (track-relative) and height, `None` when everything fits.
    fn thumb(&self) -> Option<(u32, u32)> {
        let invisible = self.invisible_rows();
        if invisible == 0 {
            return None;
        }
        let track = self.geometry.track_height as f64;
        let height = (track * VISIBLE_ROWS as f64 / self.rows() as f64).round();
        let travel = track - height;
        let top = (self.top_row as f64 * travel / invisible as f64).round();
        Some((top as u32, height as u32))
    }

    fn px_per_row(&self) -> Option<f64> {
        let (_, height) = self.thumb()?;
        let invisible = self.invisible_rows() as f64;
        let travel = self.geometry.track_height as f64 - height as f64;
        Some(travel / invisible * correction_factor(invisible, 1.21))
    }

    fn hovered_tile(&self) -> Option<&str> {
        let g = &self.geometry;
        let (x, y) = self.pointer;
        let dx = x - g.start_x;
        let dy = y - g.start_y;
        let pitch_x = g.tile_width + g.tile_spacing;
        if dx < 0 || dy < 0 || dx % pitch_x >= g.tile_width || dy % g.row_step >= g.tile_height {
            return None;
        }
        let col = (dx / pitch_x) as u32;
        let view_row = (dy / g.row_step) as u32;
        if col >= COLUMNS || view_row >= VISIBLE_ROWS {
            return None;
        }
        let index = ((self.top_row + view_row) * COLUMNS + col) as usize;
        self.pages.get(self.page)?.get(index)?.as_deref()
    }

    fn note(&mut self, action: String) {
        if self.watch.as_ref().is_some_and(|t| t.is_cancelled()) {
            self.after_cancel.push(action);
        }
    }

    fn has_next_page(&self) -> bool {
        self.page + 1 < self.pages.len()
    }

    fn render_track(&self, rect: ScreenRect) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(rect.width as u32, rect.height as u32, TRACK);
        if let Some((top, height)) = self.thumb() {
            for y in top..(top + height).min(rect.height as u32) {
                for x in 0..rect.width as u32 {
                    img.put_pixel(x, y, THUMB);
                }
            }
        }
        img
    }
}

/// Shared handle; the desktop and the reader see the same state.
#[derive(Clone)]
pub struct SimulatedInventory {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedInventory {
    /// One entry per page, tiles row-major; `None` is an empty slot.
    pub fn new(pages: Vec<Vec<Option<String>>>) -> Self {
        let geometry = GeometryProfile::initialize(1920, 1080).unwrap();
        Self {
            state: Rc::new(RefCell::new(SimState {
                geometry,
                pages,
                page: 0,
                top_row: 0,
                pointer: (0, 0),
                reads: 0,
                captures: 0,
                drags: Vec::new(),
                clicks: Vec::new(),
                abort_on_read: None,
                fail_capture_after: None,
                scripted: VecDeque::new(),
                abort_on_button_probe: None,
                watch: None,
                after_cancel: Vec::new(),
                wheel_ignored: false,
            })),
        }
    }

    pub fn state(&self) -> std::cell::RefMut<'_, SimState> {
        self.state.borrow_mut()
    }

    pub fn desktop(&self) -> SimDesktop {
        SimDesktop {
            state: self.state.clone(),
        }
    }

    pub fn reader(&self) -> SimReader {
        SimReader {
            state: self.state.clone(),
        }
    }
}

pub struct SimDesktop {
    state: Rc<RefCell<SimState>>,
}

impl Desktop for SimDesktop {
    fn move_to(&mut self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.note(format!("move_to({},{})", x, y));
        s.pointer = (x, y);
        Ok(())
    }

    fn move_by(&mut self, dx: i32, dy: i32, _duration: Duration) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.note(format!("move_by({},{})", dx, dy));
        s.pointer = (s.pointer.0 + dx, s.pointer.1 + dy);
        Ok(())
    }

    fn drag_by(&mut self, dx: i32, dy: i32, _duration: Duration) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.note(format!("drag_by({},{})", dx, dy));
        s.drags.push(dy);
        let on_track = s.geometry.scroll_track_rect().contains(s.pointer.0, s.pointer.1);
        if let (true, Some(px_per_row)) = (on_track, s.px_per_row()) {
            let moved = (dy as f64 / px_per_row).round() as i64;
            let top = (s.top_row as i64 + moved).clamp(0, s.invisible_rows() as i64);
            s.top_row = top as u32;
        }
        s.pointer = (s.pointer.0 + dx, s.pointer.1 + dy);
        Ok(())
    }

    fn scroll(&mut self, delta: i32) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.note(format!("scroll({})", delta));
        if delta > 0 && !s.wheel_ignored {
            s.top_row = 0;
        }
        Ok(())
    }

    fn click(&mut self, x: i32, y: i32) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.note(format!("click({},{})", x, y));
        s.pointer = (x, y);
        s.clicks.push((x, y));
        if (x, y) == s.geometry.next_page_button && s.has_next_page() {
            s.page += 1;
            s.top_row = 0;
        }
        Ok(())
    }

    fn capture(&mut self, rect: ScreenRect) -> Result<RgbaImage> {
        let mut s = self.state.borrow_mut();
        s.note(format!("capture({},{})", rect.left, rect.top));
        s.captures += 1;
        if s.fail_capture_after.is_some_and(|n| s.captures > n) {
            return Err(anyhow!("capture failed: window lost"));
        }

        if rect == s.geometry.scroll_track_rect() {
            return Ok(s.render_track(rect));
        }
        let (w, h) = (rect.width as u32, rect.height as u32);
        if rect == s.geometry.next_page_probe_rect() {
            if let Some(token) = &s.abort_on_button_probe {
                token.cancel();
            }
            let v = if s.has_next_page() { BUTTON_LIT } else { BUTTON_DARK };
            return Ok(RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255])));
        }
        Ok(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])))
    }
}

/// Answers with the name of the hovered tile.
pub struct SimReader {
    state: Rc<RefCell<SimState>>,
}

impl TileTextReader for SimReader {
    fn read_tile(&mut self, _image: &RgbaImage) -> Result<TileReadResult> {
        let mut s = self.state.borrow_mut();
        s.reads += 1;
        if let Some((n, token)) = &s.abort_on_read {
            if *n == s.reads {
                token.cancel();
                return Ok(TileReadResult::default());
            }
        }
        if let Some(read) = s.scripted.pop_front() {
            return Ok(read);
        }
        Ok(match s.hovered_tile() {
            Some(name) => TileReadResult {
                corrected_text: name.to_string(),
                raw_text: name.to_string(),
                matched: true,
            },
            None => TileReadResult::default(),
        })
    }
}

/// `count` distinct tiles named by page and index.
pub fn page_of(page: usize, count: usize) -> Vec<Option<String>> {
    (0..count)
        .map(|i| Some(format!("Item {}-{}", page, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::config::{ModeProfile, ScanConfig, ScanMode, ScanTiming};
    use crate::scan::orchestrator::{ScanOptions, ScanOrchestrator};
    use crate::scan::results::MemoryResultSink;
    use crate::scan::state::{ScanPhase, TilePosition};

    type SimOrchestrator = ScanOrchestrator<SimDesktop, SimReader, MemoryResultSink>;

    fn orchestrator(sim: &SimulatedInventory, cancel: CancelToken) -> SimOrchestrator {
        let config = ScanConfig {
            timing: ScanTiming::instant(),
            ..ScanConfig::default()
        };
        let geometry = GeometryProfile::initialize(1920, 1080).unwrap();
        let mode = geometry.mode(ScanMode::Normal, &ModeProfile::normal());
        let options = ScanOptions::from_config(mode, &config);
        ScanOrchestrator::new(
            geometry,
            options,
            config,
            sim.desktop(),
            sim.reader(),
            MemoryResultSink::default(),
            cancel,
        )
    }

    #[test]
    fn test_sim_thumb_matches_game_layout() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        assert_eq!(sim.state().thumb(), Some((0, 257)));
        sim.state().top_row = 8;
        assert_eq!(sim.state().thumb(), Some((256, 257)));
        let small = SimulatedInventory::new(vec![page_of(0, 24)]);
        assert_eq!(small.state().thumb(), None);
    }

    #[test]
    fn test_scans_25_rows_including_last_row() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.total_items, 100);
        assert_eq!(report.unique_items, 100);
        assert_eq!(report.unmatched, 0);
        assert_eq!(report.pages, 1);
        // two block scrolls, then the one-row nudge
        assert_eq!(sim.state().drags, vec![310, 310, 38]);
        assert_eq!(sim.state().top_row, 17);
        assert_eq!(orch.sink().flushes.len(), 1);
        assert_eq!(orch.sink().flushes[0].total_items(), 100);
        assert!(!orch.state().active);
    }

    #[test]
    fn test_final_block_skips_overlapping_rows() {
        let sim = SimulatedInventory::new(vec![page_of(0, 80)]);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.total_items, 80);
        assert_eq!(report.unique_items, 80);
        // second drag clamped at the end band
        assert_eq!(sim.state().drags, vec![388, 325]);
        assert_eq!(sim.state().top_row, 12);
    }

    #[test]
    fn test_short_list_ends_on_empty_tile() {
        let sim = SimulatedInventory::new(vec![page_of(0, 22)]);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.total_items, 22);
        assert!(sim.state().drags.is_empty());
        assert!(orch.state().empty_streak >= 1);
    }

    #[test]
    fn test_follows_next_page() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100), page_of(1, 10)]);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.pages, 2);
        assert_eq!(report.total_items, 110);
        assert_eq!(sim.state().clicks, vec![(1612, 1040)]);
        assert_eq!(sim.state().page, 1);
    }

    #[test]
    fn test_abort_keeps_partial_results() {
        let token = CancelToken::new();
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        sim.state().abort_on_read = Some((10, token.clone()));
        let mut orch = orchestrator(&sim, token);
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Aborted);
        assert_eq!(report.total_items, 9);
        assert_eq!(orch.sink().flushes.len(), 1);
        assert_eq!(sim.state().pointer, (100, 100));

        // same flush as a session that only ever saw those nine tiles
        let short = SimulatedInventory::new(vec![page_of(0, 9)]);
        let mut complete = orchestrator(&short, CancelToken::new());
        assert_eq!(complete.run().phase, ScanPhase::Completed);
        assert_eq!(orch.sink().flushes[0], complete.sink().flushes[0]);
    }

    #[test]
    fn test_fatal_error_still_flushes() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        sim.state().fail_capture_after = Some(5);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        match &report.phase {
            ScanPhase::Error(msg) => assert!(msg.contains("capture failed")),
            other => panic!("unexpected phase {other}"),
        }
        assert_eq!(report.total_items, 5);
        assert_eq!(orch.sink().flushes.len(), 1);
        assert_eq!(sim.state().pointer, (100, 100));
    }

    #[test]
    fn test_unresolved_text_is_retried_and_recorded() {
        let sim = SimulatedInventory::new(vec![page_of(0, 4)]);
        let unresolved = TileReadResult {
            corrected_text: String::new(),
            raw_text: "Xqzv Hlmt".to_string(),
            matched: false,
        };
        sim.state().scripted = vec![unresolved; 5].into();
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.total_items, 3);
        let positions = &orch.results().unmatched["Xqzv Hlmt"];
        assert_eq!(
            positions.iter().copied().collect::<Vec<_>>(),
            vec![TilePosition::new(1, 1, 1)]
        );
        // 5 for the unresolved tile, 3 matched, 2 for the empty slot
        assert_eq!(sim.state().reads, 10);
    }

    #[test]
    fn test_debug_bypass_counts_every_slot() {
        let sim = SimulatedInventory::new(vec![page_of(0, 4)]);
        let config = ScanConfig {
            timing: ScanTiming::instant(),
            fast_debug_mode: true,
            ..ScanConfig::default()
        };
        let geometry = GeometryProfile::initialize(1920, 1080).unwrap();
        let mode = geometry.mode(ScanMode::Normal, &ModeProfile::normal());
        let options = ScanOptions::from_config(mode, &config);
        let mut orch = ScanOrchestrator::new(
            geometry,
            options,
            config,
            sim.desktop(),
            sim.reader(),
            MemoryResultSink::default(),
            CancelToken::new(),
        );
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        assert_eq!(report.total_items, 32);
        assert_eq!(orch.results().counts["DEBUG_ITEM_1_1"], 1);
        assert_eq!(orch.results().counts["DEBUG_ITEM_8_4"], 1);
        assert_eq!(sim.state().reads, 0);
    }

    #[test]
    fn test_scroll_test_stops_at_end() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        let mut orch = orchestrator(&sim, CancelToken::new());
        let phase = orch.run_scroll_test(10);

        assert_eq!(phase, ScanPhase::Completed);
        assert_eq!(sim.state().drags, vec![310, 310, 165]);
        assert_eq!(sim.state().top_row, 17);
        assert!(orch.sink().flushes.is_empty());
    }

    #[test]
    fn test_already_cancelled_scan_only_parks() {
        let token = CancelToken::new();
        token.cancel();
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        sim.state().watch = Some(token.clone());
        let mut orch = orchestrator(&sim, token);
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Aborted);
        assert_eq!(report.total_items, 0);
        assert_eq!(orch.sink().flushes.len(), 1);
        assert_eq!(sim.state().after_cancel, vec!["move_to(100,100)"]);
    }

    #[test]
    fn test_abort_during_button_check_stays_on_page() {
        let token = CancelToken::new();
        let sim = SimulatedInventory::new(vec![page_of(0, 100), page_of(1, 10)]);
        sim.state().abort_on_button_probe = Some(token.clone());
        sim.state().watch = Some(token.clone());
        let mut orch = orchestrator(&sim, token);
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Aborted);
        assert_eq!(report.total_items, 100);
        assert!(sim.state().clicks.is_empty());
        assert_eq!(sim.state().page, 0);
        assert_eq!(sim.state().after_cancel, vec!["move_to(100,100)"]);
    }

    #[test]
    fn test_thumb_already_at_end_still_estimates_rows() {
        let sim = SimulatedInventory::new(vec![page_of(0, 100)]);
        sim.state().wheel_ignored = true;
        sim.state().top_row = 17;
        let mut orch = orchestrator(&sim, CancelToken::new());
        let report = orch.run();

        assert_eq!(report.phase, ScanPhase::Completed);
        // only the bottom viewport is reachable
        assert_eq!(report.total_items, 32);
        assert!(orch.results().counts.contains_key("Item 0-99"));
        assert!(sim.state().drags.is_empty());
        assert!(orch.state().estimated_total_rows.is_some());
        assert_eq!(orch.state().estimated_rows(), Some(25));
    }
}
