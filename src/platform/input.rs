//! Pointer input via SendInput.
//!
//! All events carry absolute coordinates normalised to 0-65535, the form the
//! game's raw input layer accepts. Before any event is sent the cursor is
//! checked against the screen corners: moving it into a corner is the manual
//! emergency stop.

use anyhow::{Result, anyhow};
use std::time::Duration;

use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_MOUSE, MOUSE_EVENT_FLAGS, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_WHEEL, MOUSEINPUT, SendInput,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN,
};

/// Interval between intermediate points of a smooth move.
const MOVE_STEP: Duration = Duration::from_millis(10);

/// Distance from a corner that trips the fail-safe.
const FAIL_SAFE_MARGIN: i32 = 1;

fn screen_size() -> (i32, i32) {
    unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
}

pub fn cursor_pos() -> Result<(i32, i32)> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point)? };
    Ok((point.x, point.y))
}

fn in_corner(x: i32, y: i32, width: i32, height: i32) -> bool {
    let near_x = x < FAIL_SAFE_MARGIN || x >= width - FAIL_SAFE_MARGIN;
    let near_y = y < FAIL_SAFE_MARGIN || y >= height - FAIL_SAFE_MARGIN;
    near_x && near_y
}

/// Fails when the user has pushed the cursor into a screen corner.
pub fn check_fail_safe() -> Result<()> {
    let (x, y) = cursor_pos()?;
    let (width, height) = screen_size();
    if in_corner(x, y, width, height) {
        return Err(anyhow!(
            "Fail-safe triggered: cursor in screen corner ({}, {})",
            x,
            y
        ));
    }
    Ok(())
}

fn send_mouse(x: i32, y: i32, flags: MOUSE_EVENT_FLAGS, data: i32) -> Result<()> {
    let (screen_width, screen_height) = screen_size();
    if screen_width <= 0 || screen_height <= 0 {
        return Err(anyhow!("Invalid screen size {}x{}", screen_width, screen_height));
    }

    // Normalize to 0-65535 range (required by MOUSEEVENTF_ABSOLUTE)
    let norm_x = ((x as i64 * 65535) / screen_width as i64) as i32;
    let norm_y = ((y as i64 * 65535) / screen_height as i64) as i32;

    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: norm_x,
                dy: norm_y,
                mouseData: data as u32,
                dwFlags: flags | MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE,
                ..Default::default()
            },
        },
    };
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent != 1 {
        return Err(anyhow!("SendInput failed ({} inputs sent)", sent));
    }
    Ok(())
}

/// Moves the cursor in a straight line over `duration`.
pub fn smooth_move(x: i32, y: i32, duration: Duration) -> Result<()> {
    check_fail_safe()?;
    let (from_x, from_y) = cursor_pos()?;

    let steps = (duration.as_millis() / MOVE_STEP.as_millis()) as i32;
    for i in 1..steps {
        let t = i as f64 / steps as f64;
        let ix = from_x + ((x - from_x) as f64 * t).round() as i32;
        let iy = from_y + ((y - from_y) as f64 * t).round() as i32;
        send_mouse(ix, iy, MOUSE_EVENT_FLAGS(0), 0)?;
        std::thread::sleep(MOVE_STEP);
    }
    send_mouse(x, y, MOUSE_EVENT_FLAGS(0), 0)
}

pub fn left_down() -> Result<()> {
    check_fail_safe()?;
    let (x, y) = cursor_pos()?;
    send_mouse(x, y, MOUSEEVENTF_LEFTDOWN, 0)
}

/// Releases the button without the fail-safe check, so a held button is
/// never left pressed.
pub fn left_up() -> Result<()> {
    let (x, y) = cursor_pos()?;
    send_mouse(x, y, MOUSEEVENTF_LEFTUP, 0)
}

/// One wheel event. Positive deltas scroll up.
pub fn wheel(delta: i32) -> Result<()> {
    check_fail_safe()?;
    let (x, y) = cursor_pos()?;
    send_mouse(x, y, MOUSEEVENTF_WHEEL, delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_detection() {
        assert!(in_corner(0, 0, 1920, 1080));
        assert!(in_corner(1919, 1079, 1920, 1080));
        assert!(in_corner(0, 1079, 1920, 1080));
        assert!(!in_corner(0, 500, 1920, 1080));
        assert!(!in_corner(100, 100, 1920, 1080));
    }
}
