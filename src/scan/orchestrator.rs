//! Scan state machine.
//!
//! One session walks every page: reset to top, scan blocks of rows with
//! scrollbar drags in between, pick up the bottom row when the list is longer
//! than the page's blocks, then request the next page. The aggregate results
//! are flushed on every exit path.

use anyhow::Result;
use std::time::{Duration, Instant};

use super::cancel::{CancelToken, ScanAborted};
use super::config::ScanConfig;
use super::desktop::Desktop;
use super::detection::{BrightnessBand, calculate_brightness, classify_button, is_button_active};
use super::geometry::{GeometryProfile, ModeGeometry};
use super::results::{AggregateResults, ResultSink};
use super::scroll_math::{ScrollPlan, clamp_drag, plan_scroll};
use super::scrollbar::{ScrollbarLocator, ScrollbarReading};
use super::state::{RetryPolicy, RetryStep, ScanPhase, ScanState, TileOutcome};
use crate::ocr::{TileReadResult, TileTextReader};

/// Per-session switches.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub mode: ModeGeometry,
    pub skip_overlap_rows: bool,
    /// Count synthetic names instead of reading tooltips
    pub debug_bypass: bool,
    pub debug_scroll_calculation: bool,
}

impl ScanOptions {
    pub fn from_config(mode: ModeGeometry, config: &ScanConfig) -> Self {
        Self {
            mode,
            skip_overlap_rows: config.skip_overlap_rows,
            debug_bypass: config.fast_debug_mode,
            debug_scroll_calculation: config.debug_scroll_calculation,
        }
    }
}

/// Result of one scrollbar drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The list moved and more rows follow
    Scrolled,
    /// The thumb reached the end band. `dragged` is false when it was
    /// already there before the drag.
    ReachedEnd { dragged: bool },
    /// No thumb visible: everything fits in the viewport
    NoScrollbar,
}

/// How a page ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageEnd {
    /// All rows of the page were visited
    Exhausted,
    /// An empty tile with no further page: nothing left anywhere
    InventoryFinished,
}

/// Rows of one block to scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlockSpan {
    rows: u32,
    /// Leading viewport rows already scanned in the previous block
    skip: u32,
    /// Fewer rows than a full block remain
    partial: bool,
}

/// Summary returned when a session ends.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub phase: ScanPhase,
    pub pages: u32,
    pub total_items: u32,
    pub unique_items: usize,
    pub unmatched: usize,
    pub elapsed: Duration,
}

pub struct ScanOrchestrator<D: Desktop, R: TileTextReader, S: ResultSink> {
    geometry: GeometryProfile,
    options: ScanOptions,
    config: ScanConfig,
    locator: ScrollbarLocator,
    desktop: D,
    reader: R,
    sink: S,
    cancel: CancelToken,
    state: ScanState,
    results: AggregateResults,
}

impl<D: Desktop, R: TileTextReader, S: ResultSink> ScanOrchestrator<D, R, S> {
    pub fn new(
        geometry: GeometryProfile,
        options: ScanOptions,
        config: ScanConfig,
        desktop: D,
        reader: R,
        sink: S,
        cancel: CancelToken,
    ) -> Self {
        let locator = ScrollbarLocator::from_config(&config);
        Self {
            geometry,
            options,
            config,
            locator,
            desktop,
            reader,
            sink,
            cancel,
            state: ScanState::default(),
            results: AggregateResults::new(),
        }
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn results(&self) -> &AggregateResults {
        &self.results
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Runs a full session. Never fails: errors end up in the report phase.
    pub fn run(&mut self) -> SessionReport {
        let started = Instant::now();
        self.state.active = true;

        crate::log(&format!(
            "Scan started: mode {}, {} columns, {}x{}",
            self.options.mode.mode,
            self.config.max_columns,
            self.geometry.screen_width,
            self.geometry.screen_height
        ));
        if self.options.debug_bypass {
            crate::log("[DEBUG] OCR bypass active - tiles are counted, not read");
        }

        self.state.phase = match self.scan_pages() {
            Ok(()) => ScanPhase::Completed,
            Err(e) if e.is::<ScanAborted>() => {
                crate::log("[ABORT] Scan aborted by user");
                ScanPhase::Aborted
            }
            Err(e) => {
                crate::log(&format!("[ERROR] Scan failed: {:#}", e));
                ScanPhase::Error(format!("{:#}", e))
            }
        };

        self.finish();

        let report = SessionReport {
            phase: self.state.phase.clone(),
            pages: self.state.current_page,
            total_items: self.results.total_items(),
            unique_items: self.results.unique_items(),
            unmatched: self.results.unmatched.len(),
            elapsed: started.elapsed(),
        };
        crate::log(&format!(
            "Scan finished: {} after {:.1}s ({} pages, {} items, {} unique, {} unmatched)",
            report.phase,
            report.elapsed.as_secs_f64(),
            report.pages,
            report.total_items,
            report.unique_items,
            report.unmatched
        ));
        report
    }

    /// Resets to the top and scrolls block by block, logging each plan.
    /// Nothing is counted or flushed.
    pub fn run_scroll_test(&mut self, max_scrolls: u32) -> ScanPhase {
        self.state.active = true;
        self.state.start_page();
        self.options.debug_scroll_calculation = true;

        let outcome = self.scroll_test_steps(max_scrolls);

        self.state.phase = match outcome {
            Ok(()) => ScanPhase::Completed,
            Err(e) if e.is::<ScanAborted>() => ScanPhase::Aborted,
            Err(e) => ScanPhase::Error(format!("{:#}", e)),
        };
        if let Err(e) = self.park() {
            crate::log(&format!("[WARNING] Could not park pointer: {:#}", e));
        }
        self.state.active = false;
        crate::log(&format!("[SCROLL TEST] {}", self.state.phase));
        self.state.phase.clone()
    }

    fn scroll_test_steps(&mut self, max_scrolls: u32) -> Result<()> {
        self.reset_to_top()?;
        for i in 1..=max_scrolls {
            crate::log(&format!("[SCROLL TEST] Scroll {}/{}", i, max_scrolls));
            let outcome = self.scroll_down_once()?;
            if outcome != ScrollOutcome::Scrolled {
                crate::log(&format!("[SCROLL TEST] Stopped: {:?}", outcome));
                break;
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        if let Err(e) = self.park() {
            crate::log(&format!("[WARNING] Could not park pointer: {:#}", e));
        }
        if let Err(e) = self.sink.flush(&self.results) {
            crate::log(&format!("[ERROR] Could not save results: {:#}", e));
        }
        self.state.active = false;
    }

    fn scan_pages(&mut self) -> Result<()> {
        loop {
            self.state.start_page();
            crate::log(&format!("=== Page {} ===", self.state.current_page));

            self.reset_to_top()?;
            if self.scan_page()? == PageEnd::InventoryFinished {
                crate::log("[END] Empty tile and no further page - inventory finished");
                return Ok(());
            }

            self.state.phase = ScanPhase::RequestingNextPage;
            if !self.next_page_available()? {
                crate::log("[END] No further page");
                return Ok(());
            }

            let (x, y) = self.geometry.next_page_button;
            crate::log(&format!("[PAGE] Opening page {}", self.state.current_page + 1));
            self.with_desktop(|d| d.click(x, y))?;
            self.pause(self.config.timing.page_load_ms)?;
        }
    }

    fn scan_page(&mut self) -> Result<PageEnd> {
        let mode = self.options.mode.clone();
        let mut reached_end = false;
        let mut cut_short = false;

        for block in 0..mode.blocks_per_page {
            self.cancel.checkpoint()?;
            self.state.current_block = block;

            let Some(span) = self.block_span(block) else {
                cut_short = true;
                break;
            };
            cut_short |= span.partial;

            self.state.phase = ScanPhase::ScanningBlock;
            crate::log(&format!(
                "[BLOCK] Page {}, block {}: {} rows (skipping {})",
                self.state.current_page,
                block + 1,
                span.rows,
                span.skip
            ));
            if self.scan_block(block, span)? == Some(PageEnd::InventoryFinished) {
                return Ok(PageEnd::InventoryFinished);
            }

            if reached_end || block + 1 == mode.blocks_per_page {
                break;
            }

            self.state.phase = ScanPhase::Scrolling;
            match self.scroll_down_once()? {
                ScrollOutcome::Scrolled => {}
                ScrollOutcome::NoScrollbar => {
                    crate::log("[END] No scrollbar - all rows fit on screen");
                    return Ok(PageEnd::Exhausted);
                }
                ScrollOutcome::ReachedEnd { dragged: false } => {
                    crate::log("[END] Scrollbar already at the end");
                    return Ok(PageEnd::Exhausted);
                }
                ScrollOutcome::ReachedEnd { dragged: true } => {
                    crate::log("[END] Scrollbar reached the end - scanning final block");
                    reached_end = true;
                }
            }
        }

        let rows_per_page = mode.rows_per_page();
        let longer_than_page = self
            .state
            .estimated_rows()
            .is_some_and(|rows| rows > rows_per_page);
        if !reached_end && !cut_short && longer_than_page {
            if self.scan_last_row()? == Some(PageEnd::InventoryFinished) {
                return Ok(PageEnd::InventoryFinished);
            }
        }

        Ok(PageEnd::Exhausted)
    }

    /// Rows to scan in `block`, or `None` when the estimate says the page has
    /// no rows left.
    fn block_span(&self, block: u32) -> Option<BlockSpan> {
        let mode = &self.options.mode;
        let full = BlockSpan {
            rows: mode.rows_per_block,
            skip: 0,
            partial: false,
        };

        let Some(total) = self.state.estimated_rows() else {
            return Some(full);
        };

        let remaining = total as i64 - (block * mode.rows_per_block) as i64;
        if remaining <= 0 {
            return None;
        }
        let remaining = remaining as u32;
        if remaining >= mode.rows_per_block {
            return Some(full);
        }

        let skip = if self.options.skip_overlap_rows && remaining < mode.visible_rows {
            mode.visible_rows - remaining
        } else {
            0
        };
        Some(BlockSpan {
            rows: remaining,
            skip,
            partial: true,
        })
    }

    fn scan_block(&mut self, block: u32, span: BlockSpan) -> Result<Option<PageEnd>> {
        let mode = self.options.mode.clone();

        for i in 0..span.rows {
            self.cancel.checkpoint()?;
            let y = self.geometry.block_row_y(&mode, span.skip + i, self.state.drift_correction_px);
            if y > self.geometry.inventory_bottom {
                crate::log(&format!(
                    "[WARNING] Row {} at y={} is below the inventory, skipped",
                    span.skip + i + 1,
                    y
                ));
                continue;
            }

            self.state.current_row = block * mode.rows_per_block + i + 1;
            if let Some(end) = self.scan_row(y)? {
                return Ok(Some(end));
            }
        }
        Ok(None)
    }

    fn scan_last_row(&mut self) -> Result<Option<PageEnd>> {
        self.state.phase = ScanPhase::ScanningLastRow;
        let mode = self.options.mode.clone();
        let timing = self.config.timing.clone();

        let nudge = self
            .state
            .last_block_scroll_px
            .unwrap_or(mode.legacy_block_scroll)
            / mode.rows_per_block.max(1) as i32;
        let start_x = self.geometry.track_center_x();
        let start_y = self.geometry.scroll_area_bottom - self.geometry.scaled(100);
        crate::log(&format!("[LAST ROW] Nudging scrollbar by {}px", nudge));

        self.with_desktop(|d| {
            d.move_to(start_x, start_y, Duration::from_millis(timing.thumb_move_ms))
        })?;
        self.pause(timing.thumb_hover_ms)?;
        self.with_desktop(|d| {
            d.drag_by(0, nudge, Duration::from_millis(timing.last_row_drag_ms))
        })?;
        self.pause(timing.last_row_settle_ms)?;

        self.state.current_row = mode.rows_per_page() + 1;
        let y = self.geometry.last_row_y(&mode);
        self.scan_row(y)
    }

    fn scan_row(&mut self, y: i32) -> Result<Option<PageEnd>> {
        for col in 0..self.config.max_columns {
            self.cancel.checkpoint()?;
            self.state.current_column = col + 1;
            let x = self.geometry.tile_center_x(col);

            let outcome = self.read_tile(x, y)?;
            if let Some(end) = self.apply_outcome(outcome)? {
                return Ok(Some(end));
            }
        }
        Ok(None)
    }

    fn apply_outcome(&mut self, outcome: TileOutcome) -> Result<Option<PageEnd>> {
        let position = self.state.position();
        match outcome {
            TileOutcome::Matched(name) => {
                self.state.empty_streak = 0;
                let count = self.results.record_item(&name);
                crate::log(&format!("[{}] {} (x{})", position, name, count));
                Ok(None)
            }
            TileOutcome::Unmatched(raw) => {
                self.state.empty_streak = 0;
                crate::log(&format!("[{}] [NOT DETECTED] {}", position, raw));
                self.results.record_unmatched(&raw, position);
                Ok(None)
            }
            TileOutcome::Empty => {
                self.state.empty_streak += 1;
                crate::log(&format!("[{}] [EMPTY] No tooltip", position));
                if self.next_page_available()? {
                    Ok(None)
                } else {
                    Ok(Some(PageEnd::InventoryFinished))
                }
            }
        }
    }

    fn read_tile(&mut self, x: i32, y: i32) -> Result<TileOutcome> {
        let timing = self.config.timing.clone();

        if self.options.debug_bypass {
            self.with_desktop(|d| d.move_to(x, y, Duration::from_millis(timing.tile_move_ms)))?;
            self.pause(timing.debug_tile_ms)?;
            return Ok(TileOutcome::Matched(format!(
                "DEBUG_ITEM_{}_{}",
                self.state.current_row, self.state.current_column
            )));
        }

        let mut policy = RetryPolicy::new();
        let outcome = loop {
            let wiggle = timing.wiggle_px;
            self.with_desktop(|d| d.move_to(x, y, Duration::from_millis(timing.tile_move_ms)))?;
            self.with_desktop(|d| d.move_by(0, -wiggle, Duration::ZERO))?;
            self.pause(timing.wiggle_pause_ms)?;
            self.with_desktop(|d| d.move_by(0, wiggle, Duration::ZERO))?;
            self.pause(timing.tooltip_settle_ms)?;

            let ocr_rect = self.geometry.ocr_rect();
            let image = self.with_desktop(|d| d.capture(ocr_rect))?;
            let read = match self.reader.read_tile(&image) {
                Ok(read) => read,
                Err(e) => {
                    crate::log(&format!("[OCR] Read failed: {:#}", e));
                    TileReadResult::default()
                }
            };
            self.cancel.checkpoint()?;

            match policy.observe(&read) {
                RetryStep::Done(outcome) => break outcome,
                RetryStep::Retry => {
                    crate::log(&format!(
                        "[RETRY] {}: attempt {}/{} ({})",
                        self.state.position(),
                        policy.attempts() + 1,
                        policy.budget(),
                        if read.raw_text.trim().is_empty() {
                            "no text".to_string()
                        } else {
                            format!("unresolved '{}'", read.raw_text.trim())
                        }
                    ));
                }
            }
        };

        self.park()?;
        Ok(outcome)
    }

    /// Probes the next-page button brightness.
    fn next_page_available(&mut self) -> Result<bool> {
        let probe = self.geometry.next_page_probe_rect();
        let image = self.with_desktop(|d| d.capture(probe))?;
        let brightness = calculate_brightness(&image);
        let band = BrightnessBand::new(
            self.config.button_brightness_min,
            self.config.button_brightness_max,
        );
        crate::log(&format!(
            "[BUTTON] Brightness: {:.1} → {}",
            brightness,
            classify_button(brightness, band)
        ));
        Ok(is_button_active(brightness, band))
    }

    fn reset_to_top(&mut self) -> Result<()> {
        self.state.phase = ScanPhase::ResettingToTop;
        let timing = self.config.timing.clone();
        let (first_x, first_y) = self.geometry.first_tile_point();
        let tile_move = Duration::from_millis(timing.tile_move_ms);

        self.with_desktop(|d| d.move_to(first_x, first_y, tile_move))?;
        self.pause(timing.reset_hover_ms)?;
        for _ in 0..timing.reset_scroll_events {
            self.with_desktop(|d| d.scroll(timing.reset_scroll_delta))?;
            self.pause(timing.reset_scroll_interval_ms)?;
        }
        self.pause(timing.reset_settle_ms)?;

        // hovering off the grid and back refreshes the tooltip
        let (away_x, away_y) = self.geometry.below_grid_point();
        self.with_desktop(|d| d.move_to(away_x, away_y, tile_move))?;
        self.pause(timing.reset_hover_ms)?;
        self.with_desktop(|d| d.move_to(first_x, first_y, tile_move))?;
        self.pause(timing.reset_tooltip_ms)?;

        self.state.current_block = 0;
        self.state.drift_correction_px = 0;
        Ok(())
    }

    fn read_scrollbar(&mut self) -> Result<Option<ScrollbarReading>> {
        let track = self.geometry.scroll_track_rect();
        let image = self.with_desktop(|d| d.capture(track))?;
        Ok(self.locator.locate(&image).map(|r| r.offset(track.top)))
    }

    fn scroll_down_once(&mut self) -> Result<ScrollOutcome> {
        let timing = self.config.timing.clone();
        let mode = self.options.mode.clone();

        let Some(reading) = self.read_scrollbar()? else {
            return Ok(ScrollOutcome::NoScrollbar);
        };

        let plan = plan_scroll(
            self.geometry.track_height,
            reading.thumb_height,
            mode.rows_per_block,
            mode.visible_rows,
            self.config.scroll_correction_factor,
        );
        self.state.estimated_total_rows = Some(plan.estimated_total_rows);
        if self.options.debug_scroll_calculation {
            log_plan(&plan, &reading);
        }
        if self.geometry.is_in_end_band(reading.bottom_y) || plan.distance == 0 {
            return Ok(ScrollOutcome::ReachedEnd { dragged: false });
        }

        let distance = clamp_drag(reading.center_y, plan.distance, self.geometry.scrollbar_end_max);
        if distance != plan.distance {
            crate::log(&format!(
                "[SCROLL] Drag clamped from {}px to {}px",
                plan.distance, distance
            ));
        }
        self.state.last_block_scroll_px = Some(distance);

        let thumb_x = self.geometry.track_center_x();
        self.with_desktop(|d| {
            d.move_to(thumb_x, reading.center_y, Duration::from_millis(timing.thumb_move_ms))
        })?;
        self.pause(timing.thumb_hover_ms)?;
        self.with_desktop(|d| d.drag_by(0, distance, Duration::from_millis(timing.drag_ms)))?;
        self.pause(timing.scroll_settle_ms)?;

        self.state.current_block += 1;
        self.state.drift_correction_px += self.config.drift_compensation_per_block;
        crate::log(&format!(
            "[SCROLL] Dragged {}px (~{} rows total)",
            distance,
            self.state.estimated_rows().unwrap_or(0)
        ));

        self.pause(timing.post_scroll_check_ms)?;
        match self.read_scrollbar()? {
            Some(after) if self.geometry.is_in_end_band(after.bottom_y) => {
                Ok(ScrollOutcome::ReachedEnd { dragged: true })
            }
            _ => Ok(ScrollOutcome::Scrolled),
        }
    }

    /// Runs a pointer or screen operation unless the scan was aborted.
    fn with_desktop<T>(&mut self, op: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        self.cancel.checkpoint()?;
        op(&mut self.desktop)
    }

    /// Moves the pointer out of the grid. Also runs after an abort.
    fn park(&mut self) -> Result<()> {
        let [x, y] = self.config.park_position;
        self.desktop.move_to(x, y, Duration::ZERO)
    }

    /// Sleeps in poll slices, checking for abort between slices.
    fn pause(&self, millis: u64) -> Result<()> {
        self.cancel.checkpoint()?;
        if millis == 0 {
            return Ok(());
        }

        let deadline = Instant::now() + Duration::from_millis(millis);
        let slice = self.config.timing.poll_slice();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(slice.min(deadline - now));
            self.cancel.checkpoint()?;
        }
    }
}

fn log_plan(plan: &ScrollPlan, reading: &ScrollbarReading) {
    crate::log(&format!(
        "[SCROLL DEBUG] thumb: center={} bottom={} height={}px, track={}px",
        reading.center_y, reading.bottom_y, plan.thumb_height, plan.track_height
    ));
    crate::log(&format!(
        "[SCROLL DEBUG] rows: total={:.2} invisible={:.2}, travel={}px",
        plan.estimated_total_rows, plan.invisible_rows, plan.travel_space
    ));
    crate::log(&format!(
        "[SCROLL DEBUG] distance: base={:.2}px x {:.3} = {}px",
        plan.base_distance, plan.correction, plan.distance
    ));
}
