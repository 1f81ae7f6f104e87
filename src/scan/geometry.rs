//! Screen geometry of the inventory UI.
//!
//! All positions are measured at 1920x1080 and scaled linearly by
//! `width / 1920`, truncating to whole pixels. Scaling is driven by the
//! width only; the game keeps a 16:9 layout.

use anyhow::{Result, anyhow};

use super::config::{ModeProfile, ScanMode};
use super::desktop::ScreenRect;

pub const BASE_WIDTH: i32 = 1920;
pub const BASE_HEIGHT: i32 = 1080;

/// Resolution used when nothing else is known.
pub const DEFAULT_RESOLUTION: (i32, i32) = (BASE_WIDTH, BASE_HEIGHT);

fn scale_px(base: i32, scale: f64) -> i32 {
    (base as f64 * scale).floor() as i32
}

/// Every screen coordinate the scanner needs at one resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryProfile {
    pub screen_width: i32,
    pub screen_height: i32,
    pub scale: f64,

    pub inventory_top: i32,
    pub inventory_bottom: i32,
    pub inventory_left: i32,
    pub inventory_right: i32,

    /// Thumb bottoms inside this band mean the list is at its end
    pub scrollbar_end_min: i32,
    pub scrollbar_end_max: i32,

    pub border_offset_top: i32,
    pub border_offset_left: i32,
    pub tile_width: i32,
    pub tile_height: i32,
    pub tile_spacing: i32,
    pub row_step: i32,

    pub scroll_area_left: i32,
    pub scroll_area_top: i32,
    pub scroll_area_right: i32,
    pub scroll_area_bottom: i32,
    pub track_height: i32,

    pub ocr_left: i32,
    pub ocr_top: i32,
    pub ocr_right: i32,
    pub ocr_bottom: i32,
    pub ocr_width: i32,
    pub ocr_height: i32,

    /// Top-left corner of the first tile
    pub start_x: i32,
    pub start_y: i32,
    pub hover_offset_x: i32,
    pub first_row_y_offset: i32,
    pub legacy_block_scroll: i32,

    pub next_page_probe: ScreenRect,
    pub next_page_button: (i32, i32),
}

impl GeometryProfile {
    /// Scales the baseline layout to the target resolution.
    pub fn initialize(target_width: i32, target_height: i32) -> Result<Self> {
        if target_width <= 0 {
            return Err(anyhow!("Invalid target width: {}", target_width));
        }

        let scale = target_width as f64 / BASE_WIDTH as f64;
        let s = |base: i32| scale_px(base, scale);

        let inventory_top = s(220);
        let inventory_bottom = s(1021);
        let inventory_left = s(1348);
        let inventory_right = s(1790);
        let border_offset_top = s(4);
        let border_offset_left = s(4);

        let scroll_area_left = s(1790);
        let scroll_area_top = s(220);
        let scroll_area_right = s(1800);
        let scroll_area_bottom = s(1022);

        let ocr_left = s(1095);
        let ocr_top = s(100);
        let ocr_right = s(1326);
        let ocr_bottom = s(135);

        Ok(Self {
            screen_width: target_width,
            screen_height: target_height,
            scale,
            inventory_top,
            inventory_bottom,
            inventory_left,
            inventory_right,
            scrollbar_end_min: s(1010),
            scrollbar_end_max: s(1021),
            border_offset_top,
            border_offset_left,
            tile_width: s(86),
            tile_height: s(86),
            tile_spacing: s(10),
            row_step: s(97),
            scroll_area_left,
            scroll_area_top,
            scroll_area_right,
            scroll_area_bottom,
            track_height: scroll_area_bottom - scroll_area_top,
            ocr_left,
            ocr_top,
            ocr_right,
            ocr_bottom,
            ocr_width: ocr_right - ocr_left,
            ocr_height: ocr_bottom - ocr_top,
            start_x: inventory_left + border_offset_left,
            start_y: inventory_top + border_offset_top,
            hover_offset_x: s(53),
            first_row_y_offset: s(38),
            legacy_block_scroll: s(322),
            next_page_probe: ScreenRect::new(s(1608), s(1034), s(8), s(13)),
            next_page_button: (s(1612), s(1040)),
        })
    }

    /// Scales a mode profile to this resolution.
    pub fn mode(&self, mode: ScanMode, profile: &ModeProfile) -> ModeGeometry {
        ModeGeometry {
            mode,
            rows_per_block: profile.rows_per_block,
            blocks_per_page: profile.blocks_per_page,
            visible_rows: profile.visible_rows,
            row_step: scale_px(profile.row_step, self.scale),
            tile_height: scale_px(profile.tile_height, self.scale),
            legacy_block_scroll: scale_px(profile.legacy_block_scroll, self.scale),
        }
    }

    /// Scales an arbitrary baseline distance.
    pub fn scaled(&self, base: i32) -> i32 {
        scale_px(base, self.scale)
    }

    /// Horizontal hover point of a column.
    pub fn tile_center_x(&self, col: u32) -> i32 {
        self.start_x + self.hover_offset_x + col as i32 * (self.tile_width + self.tile_spacing)
    }

    /// Vertical hover point of a viewport row within a block.
    pub fn block_row_y(&self, mode: &ModeGeometry, viewport_row: u32, drift: i32) -> i32 {
        self.start_y + mode.tile_height / 2 - drift + viewport_row as i32 * mode.row_step
    }

    /// Vertical hover point of the bottom-most visible row.
    pub fn last_row_y(&self, mode: &ModeGeometry) -> i32 {
        self.inventory_bottom - self.border_offset_top - mode.tile_height / 2
    }

    /// Hover point of the first tile, used while resetting to the top.
    pub fn first_tile_point(&self) -> (i32, i32) {
        (
            self.start_x + self.hover_offset_x,
            self.start_y + self.first_row_y_offset,
        )
    }

    /// A point just below the grid, used to refresh hover state.
    pub fn below_grid_point(&self) -> (i32, i32) {
        (
            self.start_x + self.scaled(200),
            self.inventory_bottom + self.scaled(20),
        )
    }

    pub fn scroll_track_rect(&self) -> ScreenRect {
        ScreenRect::from_edges(
            self.scroll_area_left,
            self.scroll_area_top,
            self.scroll_area_right,
            self.scroll_area_bottom,
        )
    }

    pub fn track_center_x(&self) -> i32 {
        (self.scroll_area_left + self.scroll_area_right) / 2
    }

    pub fn ocr_rect(&self) -> ScreenRect {
        ScreenRect::new(self.ocr_left, self.ocr_top, self.ocr_width, self.ocr_height)
    }

    pub fn next_page_probe_rect(&self) -> ScreenRect {
        self.next_page_probe
    }

    /// True when a thumb bottom lies inside the end band.
    pub fn is_in_end_band(&self, thumb_bottom_y: i32) -> bool {
        (self.scrollbar_end_min..=self.scrollbar_end_max).contains(&thumb_bottom_y)
    }
}

/// Tile grid of one scan mode at the current resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeGeometry {
    pub mode: ScanMode,
    pub rows_per_block: u32,
    pub blocks_per_page: u32,
    pub visible_rows: u32,
    pub row_step: i32,
    pub tile_height: i32,
    pub legacy_block_scroll: i32,
}

impl ModeGeometry {
    /// Rows covered by the full blocks of one page.
    pub fn rows_per_page(&self) -> u32 {
        self.blocks_per_page * self.rows_per_block
    }
}
