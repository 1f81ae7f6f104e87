//! Win32 backend: game window, screen capture, pointer input and keys.

pub mod capture;
pub mod input;
pub mod keys;
pub mod window;

use anyhow::Result;
use image::RgbaImage;
use std::time::Duration;

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::HiDpi::{
    DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
};

use crate::scan::{Desktop, ScreenRect};
use capture::WindowCapture;

pub use keys::HotKey;
pub use window::{client_screen_rect, find_game_window, focus_window, game_in_foreground};

/// Makes screen coordinates physical pixels, matching the captured frames.
pub fn enable_dpi_awareness() {
    if unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        .is_err()
    {
        crate::log("[WARNING] Could not enable per-monitor DPI awareness");
    }
}

/// `Desktop` backed by SendInput and Windows Graphics Capture.
pub struct WindowsDesktop {
    capture: WindowCapture,
}

impl WindowsDesktop {
    pub fn new(hwnd: HWND) -> Result<Self> {
        Ok(Self {
            capture: WindowCapture::new(hwnd)?,
        })
    }
}

impl Desktop for WindowsDesktop {
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<()> {
        input::smooth_move(x, y, duration)
    }

    fn move_by(&mut self, dx: i32, dy: i32, duration: Duration) -> Result<()> {
        let (x, y) = input::cursor_pos()?;
        input::smooth_move(x + dx, y + dy, duration)
    }

    fn drag_by(&mut self, dx: i32, dy: i32, duration: Duration) -> Result<()> {
        let (x, y) = input::cursor_pos()?;
        input::left_down()?;
        let moved = input::smooth_move(x + dx, y + dy, duration);
        let released = input::left_up();
        moved.and(released)
    }

    fn scroll(&mut self, delta: i32) -> Result<()> {
        input::wheel(delta)
    }

    fn click(&mut self, x: i32, y: i32) -> Result<()> {
        input::smooth_move(x, y, Duration::ZERO)?;
        input::left_down()?;
        std::thread::sleep(Duration::from_millis(50));
        input::left_up()
    }

    fn capture(&mut self, rect: ScreenRect) -> Result<RgbaImage> {
        self.capture.grab(rect)
    }
}
