//! Scroll distance calculation from the scrollbar thumb size.
//!
//! The thumb height tells how much of the list is visible, which gives the
//! total row count and the pixels of thumb travel per row. Small lists scroll
//! less per pixel than the linear model predicts, so the correction factor
//! rises below 10 hidden rows.

/// Correction applied at or below `SMALL_INVENTORY_ROWS` hidden rows.
pub const SMALL_INVENTORY_FACTOR: f64 = 1.28;
pub const SMALL_INVENTORY_ROWS: f64 = 8.0;
pub const LARGE_INVENTORY_ROWS: f64 = 10.0;

/// Slack past the end band a clamped drag may reach.
pub const END_BAND_BUFFER: i32 = 5;

/// Every intermediate value of one scroll distance calculation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollPlan {
    pub track_height: i32,
    pub thumb_height: i32,
    pub estimated_total_rows: f64,
    pub invisible_rows: f64,
    pub travel_space: i32,
    pub base_distance: f64,
    pub correction: f64,
    /// Final drag distance in pixels, never negative
    pub distance: i32,
}

/// Total rows implied by a thumb of `thumb_height` on a track of `track_height`.
pub fn estimate_total_rows(track_height: f64, visible_rows: u32, thumb_height: f64) -> f64 {
    track_height * visible_rows as f64 / thumb_height
}

/// Correction factor for the number of hidden rows.
pub fn correction_factor(invisible_rows: f64, base: f64) -> f64 {
    if invisible_rows >= LARGE_INVENTORY_ROWS {
        base
    } else if invisible_rows <= SMALL_INVENTORY_ROWS {
        SMALL_INVENTORY_FACTOR
    } else {
        let t = (invisible_rows - SMALL_INVENTORY_ROWS) / (LARGE_INVENTORY_ROWS - SMALL_INVENTORY_ROWS);
        SMALL_INVENTORY_FACTOR + t * (base - SMALL_INVENTORY_FACTOR)
    }
}

/// Plans a drag that scrolls `rows_per_block` rows.
pub fn plan_scroll(
    track_height: i32,
    thumb_height: i32,
    rows_per_block: u32,
    visible_rows: u32,
    base_correction: f64,
) -> ScrollPlan {
    let travel_space = track_height - thumb_height;

    if thumb_height <= 0 {
        return ScrollPlan {
            track_height,
            thumb_height,
            estimated_total_rows: visible_rows as f64,
            invisible_rows: 0.0,
            travel_space,
            base_distance: 0.0,
            correction: 1.0,
            distance: 0,
        };
    }

    let estimated_total_rows =
        estimate_total_rows(track_height as f64, visible_rows, thumb_height as f64);
    let invisible_rows = estimated_total_rows - visible_rows as f64;

    if invisible_rows <= 0.0 || travel_space <= 0 {
        return ScrollPlan {
            track_height,
            thumb_height,
            estimated_total_rows,
            invisible_rows,
            travel_space,
            base_distance: 0.0,
            correction: 1.0,
            distance: 0,
        };
    }

    let base_distance = travel_space as f64 * rows_per_block as f64 / invisible_rows;
    let correction = correction_factor(invisible_rows, base_correction);
    let distance = (base_distance * correction).floor().max(0.0) as i32;

    ScrollPlan {
        track_height,
        thumb_height,
        estimated_total_rows,
        invisible_rows,
        travel_space,
        base_distance,
        correction,
        distance,
    }
}

/// Drag distance only.
pub fn compute_scroll_pixels(
    track_height: i32,
    thumb_height: i32,
    rows_per_block: u32,
    visible_rows: u32,
    base_correction: f64,
) -> i32 {
    plan_scroll(
        track_height,
        thumb_height,
        rows_per_block,
        visible_rows,
        base_correction,
    )
    .distance
}

/// Shortens a drag so the thumb centre never passes `end_max + END_BAND_BUFFER`.
pub fn clamp_drag(thumb_center_y: i32, distance: i32, end_max: i32) -> i32 {
    let max_y = end_max + END_BAND_BUFFER;
    if thumb_center_y + distance > max_y {
        (max_y - thumb_center_y).max(0)
    } else {
        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: i32 = 802;

    #[test]
    fn test_nothing_hidden_means_no_scroll() {
        // thumb fills the track: 8 visible of 8
        assert_eq!(compute_scroll_pixels(TRACK, TRACK, 8, 8, 1.21), 0);
        let plan = plan_scroll(TRACK, TRACK, 8, 8, 1.21);
        assert!((plan.estimated_total_rows - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_factor_breakpoints() {
        assert_eq!(correction_factor(8.0, 1.21), 1.28);
        assert_eq!(correction_factor(5.0, 1.21), 1.28);
        assert_eq!(correction_factor(10.0, 1.21), 1.21);
        assert_eq!(correction_factor(40.0, 1.21), 1.21);
        assert!((correction_factor(9.0, 1.21) - 1.245).abs() < 1e-9);
    }

    #[test]
    fn test_factor_is_continuous() {
        let below = correction_factor(8.0 + 1e-9, 1.21);
        let above = correction_factor(10.0 - 1e-9, 1.21);
        assert!((below - 1.28).abs() < 1e-6);
        assert!((above - 1.21).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_is_monotonic_in_thumb_height() {
        let mut previous = f64::INFINITY;
        for h in 1..=TRACK {
            let estimate = estimate_total_rows(TRACK as f64, 8, h as f64);
            assert!(estimate <= previous, "estimate rose at thumb height {}", h);
            previous = estimate;
        }
    }

    #[test]
    fn test_twenty_five_rows() {
        // thumb 257px on an 802px track: ~25 rows, 17 hidden
        let plan = plan_scroll(TRACK, 257, 8, 8, 1.21);
        assert_eq!(plan.estimated_total_rows.ceil() as u32, 25);
        assert_eq!(plan.travel_space, 545);
        assert_eq!(plan.correction, 1.21);
        assert_eq!(plan.distance, 310);
    }

    #[test]
    fn test_small_inventory_uses_raised_factor() {
        // 12 rows total: 4 hidden
        let plan = plan_scroll(TRACK, 535, 8, 8, 1.21);
        assert!(plan.invisible_rows < SMALL_INVENTORY_ROWS);
        assert_eq!(plan.correction, SMALL_INVENTORY_FACTOR);
        assert!(plan.distance > 0);
    }

    #[test]
    fn test_zero_thumb_height_is_safe() {
        let plan = plan_scroll(TRACK, 0, 8, 8, 1.21);
        assert_eq!(plan.distance, 0);
        assert_eq!(plan.estimated_total_rows, 8.0);
    }

    #[test]
    fn test_clamp_drag() {
        // centre 701, end band max 1021: at most 325px
        assert_eq!(clamp_drag(701, 388, 1021), 325);
        assert_eq!(clamp_drag(348, 310, 1021), 310);
        assert_eq!(clamp_drag(1030, 50, 1021), 0);
    }
}
