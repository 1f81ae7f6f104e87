//! Configuration types for the scanner.
//!
//! Loads settings from config.json at startup. Provides scrollbar colours,
//! the per-mode grid profiles, next-page detection thresholds and timing
//! parameters.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<ScanConfig> = OnceLock::new();

/// An RGB colour used for scrollbar thumb matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Which tile grid the inventory shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    /// 1x1 items (helmets, armor, weapons)
    Normal,
    /// 1x2 items (undersuits), twice as tall
    Undersuit,
}

impl ScanMode {
    /// Maps the command-line mode number (1 or 2) to a mode.
    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            1 => Ok(ScanMode::Normal),
            2 => Ok(ScanMode::Undersuit),
            other => Err(anyhow!(
                "Unknown scan mode {} (expected 1 = 1x1 items, 2 = 1x2 undersuits)",
                other
            )),
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Normal => write!(f, "1x1 (Normal)"),
            ScanMode::Undersuit => write!(f, "1x2 (Undersuits)"),
        }
    }
}

/// Grid parameters of one scan mode in baseline (1920-wide) pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Rows scanned before each scroll
    pub rows_per_block: u32,
    /// Vertical distance between tile rows
    pub row_step: i32,
    /// Tile height
    pub tile_height: i32,
    /// Blocks scanned per page before the last-row pass
    pub blocks_per_page: u32,
    /// Rows fully visible in the viewport
    pub visible_rows: u32,
    /// Fixed per-block scroll distance used when no scrollbar reading exists
    pub legacy_block_scroll: i32,
}

impl ModeProfile {
    pub fn normal() -> Self {
        Self {
            rows_per_block: 8,
            row_step: 97,
            tile_height: 86,
            blocks_per_page: 3,
            visible_rows: 8,
            legacy_block_scroll: 322,
        }
    }

    pub fn undersuit() -> Self {
        Self {
            rows_per_block: 4,
            row_step: 180,
            tile_height: 170,
            blocks_per_page: 6,
            visible_rows: 4,
            legacy_block_scroll: 160,
        }
    }
}

/// Delays between pointer operations, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanTiming {
    /// Pointer travel time to a tile
    pub tile_move_ms: u64,
    /// Vertical wiggle distance that re-triggers the tooltip
    pub wiggle_px: i32,
    pub wiggle_pause_ms: u64,
    /// Wait after the wiggle before the tooltip is captured
    pub tooltip_settle_ms: u64,
    pub reset_scroll_events: u32,
    pub reset_scroll_delta: i32,
    pub reset_scroll_interval_ms: u64,
    pub reset_settle_ms: u64,
    pub reset_hover_ms: u64,
    pub reset_tooltip_ms: u64,
    pub thumb_move_ms: u64,
    pub thumb_hover_ms: u64,
    pub drag_ms: u64,
    pub scroll_settle_ms: u64,
    pub post_scroll_check_ms: u64,
    pub last_row_drag_ms: u64,
    pub last_row_settle_ms: u64,
    /// Wait after clicking the next-page button
    pub page_load_ms: u64,
    /// Hover time per tile in the debug bypass
    pub debug_tile_ms: u64,
    /// Slice length for interruptible waits (at most 100)
    pub poll_slice_ms: u64,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            tile_move_ms: 20,
            wiggle_px: 3,
            wiggle_pause_ms: 50,
            tooltip_settle_ms: 200,
            reset_scroll_events: 40,
            reset_scroll_delta: 1200,
            reset_scroll_interval_ms: 40,
            reset_settle_ms: 1500,
            reset_hover_ms: 100,
            reset_tooltip_ms: 250,
            thumb_move_ms: 50,
            thumb_hover_ms: 150,
            drag_ms: 300,
            scroll_settle_ms: 600,
            post_scroll_check_ms: 200,
            last_row_drag_ms: 200,
            last_row_settle_ms: 300,
            page_load_ms: 5000,
            debug_tile_ms: 250,
            poll_slice_ms: 25,
        }
    }
}

impl ScanTiming {
    /// All delays zero. Used by the simulated desktop in tests.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            tile_move_ms: 0,
            wiggle_pause_ms: 0,
            tooltip_settle_ms: 0,
            reset_scroll_interval_ms: 0,
            reset_settle_ms: 0,
            reset_hover_ms: 0,
            reset_tooltip_ms: 0,
            thumb_move_ms: 0,
            thumb_hover_ms: 0,
            drag_ms: 0,
            scroll_settle_ms: 0,
            post_scroll_check_ms: 0,
            last_row_drag_ms: 0,
            last_row_settle_ms: 0,
            page_load_ms: 0,
            debug_tile_ms: 0,
            ..Self::default()
        }
    }

    /// Poll slice clamped to 1..=100 ms.
    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.poll_slice_ms.clamp(1, 100))
    }
}

/// Complete scanner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Executable name of the game process (case-insensitive)
    #[serde(default = "default_game_process")]
    pub game_process: String,
    /// Thumb colour at rest
    #[serde(default = "default_scrollbar_color")]
    pub scrollbar_color: RgbColor,
    /// Thumb colour while hovered
    #[serde(default = "default_scrollbar_color_hover")]
    pub scrollbar_color_hover: RgbColor,
    /// Per-channel tolerance for thumb colour matching
    #[serde(default = "default_scroll_color_tolerance")]
    pub scroll_color_tolerance: u8,
    /// Tile columns in the inventory grid
    #[serde(default = "default_max_columns")]
    pub max_columns: u32,
    /// Empirical multiplier applied to the computed scroll distance
    #[serde(default = "default_scroll_correction_factor")]
    pub scroll_correction_factor: f64,
    /// Accumulated vertical drift per scrolled block, in pixels
    #[serde(default)]
    pub drift_compensation_per_block: i32,
    /// Next-page button is active when brightness lies in [min, max]
    #[serde(default = "default_button_brightness_min")]
    pub button_brightness_min: f32,
    #[serde(default = "default_button_brightness_max")]
    pub button_brightness_max: f32,
    #[serde(default = "ModeProfile::normal")]
    pub normal_mode: ModeProfile,
    #[serde(default = "ModeProfile::undersuit")]
    pub undersuit_mode: ModeProfile,
    #[serde(default)]
    pub timing: ScanTiming,
    /// Skip OCR and count synthetic names per tile
    #[serde(default)]
    pub fast_debug_mode: bool,
    /// Log every intermediate value of the scroll distance calculation
    #[serde(default)]
    pub debug_scroll_calculation: bool,
    /// Skip rows already scanned when the final block overlaps the previous one
    #[serde(default = "default_true")]
    pub skip_overlap_rows: bool,
    /// Where the pointer is parked after each tile and at session end
    #[serde(default = "default_park_position")]
    pub park_position: [i32; 2],
    /// Catalog location: `.db` (SQLite items table) or a text file with one name per line
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_results_file")]
    pub results_file: String,
    #[serde(default = "default_unmatched_file")]
    pub unmatched_file: String,
    /// Upscale factor applied to the tooltip before OCR
    #[serde(default = "default_ocr_upscale")]
    pub ocr_upscale: u32,
}

fn default_game_process() -> String {
    "StarCitizen.exe".to_string()
}

fn default_scrollbar_color() -> RgbColor {
    RgbColor::new(17, 103, 120)
}

fn default_scrollbar_color_hover() -> RgbColor {
    RgbColor::new(29, 160, 145)
}

fn default_scroll_color_tolerance() -> u8 {
    15
}

fn default_max_columns() -> u32 {
    4
}

fn default_scroll_correction_factor() -> f64 {
    1.21
}

fn default_button_brightness_min() -> f32 {
    65.0
}

fn default_button_brightness_max() -> f32 {
    85.0
}

fn default_true() -> bool {
    true
}

fn default_park_position() -> [i32; 2] {
    [100, 100]
}

fn default_catalog_path() -> String {
    "data/inventory.db".to_string()
}

fn default_results_file() -> String {
    "detected_items.txt".to_string()
}

fn default_unmatched_file() -> String {
    "not_detected.md".to_string()
}

fn default_ocr_upscale() -> u32 {
    6
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            game_process: default_game_process(),
            scrollbar_color: default_scrollbar_color(),
            scrollbar_color_hover: default_scrollbar_color_hover(),
            scroll_color_tolerance: default_scroll_color_tolerance(),
            max_columns: default_max_columns(),
            scroll_correction_factor: default_scroll_correction_factor(),
            drift_compensation_per_block: 0,
            button_brightness_min: default_button_brightness_min(),
            button_brightness_max: default_button_brightness_max(),
            normal_mode: ModeProfile::normal(),
            undersuit_mode: ModeProfile::undersuit(),
            timing: ScanTiming::default(),
            fast_debug_mode: false,
            debug_scroll_calculation: false,
            skip_overlap_rows: true,
            park_position: default_park_position(),
            catalog_path: default_catalog_path(),
            results_file: default_results_file(),
            unmatched_file: default_unmatched_file(),
            ocr_upscale: default_ocr_upscale(),
        }
    }
}

impl ScanConfig {
    /// Returns the grid profile for a mode.
    pub fn profile(&self, mode: ScanMode) -> &ModeProfile {
        match mode {
            ScanMode::Normal => &self.normal_mode,
            ScanMode::Undersuit => &self.undersuit_mode,
        }
    }
}

/// Parses a config file. Missing or broken files yield defaults.
pub fn load_config_from(config_path: &Path) -> ScanConfig {
    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    ScanConfig::default()
}

/// Loads configuration from config.json next to the executable.
fn load_config() -> ScanConfig {
    let config_path = crate::paths::get_exe_dir().join("config.json");
    crate::log(&format!("Looking for config at: {}", config_path.display()));
    load_config_from(&config_path)
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns the global configuration, loading it on first use.
pub fn get_config() -> &'static ScanConfig {
    CONFIG.get_or_init(load_config)
}
