//! Pointer and screen seam used by the scan engine.

use anyhow::Result;
use image::RgbaImage;
use std::time::Duration;

/// A rectangle in absolute screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a rect from its edges (right and bottom exclusive).
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Drives the pointer and reads the screen.
///
/// Every operation may fail; a failure here ends the session with an error.
pub trait Desktop {
    /// Moves the pointer to an absolute position over `duration`.
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<()>;

    /// Moves the pointer relative to its current position.
    fn move_by(&mut self, dx: i32, dy: i32, duration: Duration) -> Result<()>;

    /// Presses the left button at the current position, moves by the offset
    /// and releases.
    fn drag_by(&mut self, dx: i32, dy: i32, duration: Duration) -> Result<()>;

    /// Sends a wheel event. Positive deltas scroll up.
    fn scroll(&mut self, delta: i32) -> Result<()>;

    /// Moves to the position and clicks the left button.
    fn click(&mut self, x: i32, y: i32) -> Result<()>;

    /// Captures a screen region as RGBA pixels.
    fn capture(&mut self, rect: ScreenRect) -> Result<RgbaImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = ScreenRect::from_edges(1790, 220, 1800, 1022);
        assert_eq!(rect.width, 10);
        assert_eq!(rect.height, 802);
        assert_eq!(rect.right(), 1800);
        assert_eq!(rect.bottom(), 1022);
        assert!(rect.contains(1795, 220));
        assert!(!rect.contains(1800, 500));
        assert!(!rect.contains(1795, 1022));
    }
}
