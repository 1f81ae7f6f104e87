//! Game window discovery and focus.

use anyhow::{Result, anyhow};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindowVisible, SW_RESTORE,
    SetForegroundWindow, ShowWindow,
};

use crate::scan::ScreenRect;

/// Title fragment of the game window, used for the foreground check.
const GAME_TITLE: &str = "star citizen";

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let title_len = GetWindowTextLengthW(hwnd);
        if title_len <= 0 {
            return String::new();
        }
        let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut title_buf);
        OsString::from_wide(&title_buf[..copied.max(0) as usize])
            .to_string_lossy()
            .to_string()
    }
}

/// Executable file name of the process owning `hwnd`.
fn process_name(hwnd: HWND) -> Option<String> {
    unsafe {
        let mut process_id: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut process_id));
        if process_id == 0 {
            return None;
        }

        let process_handle =
            OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id).ok()?;
        let mut name_buf: Vec<u16> = vec![0; 1024];
        let mut len = name_buf.len() as u32;
        let result = QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(name_buf.as_mut_ptr()),
            &mut len,
        );
        let _ = windows::Win32::Foundation::CloseHandle(process_handle);
        if result.is_err() || len == 0 {
            return None;
        }

        let full_path = OsString::from_wide(&name_buf[..len as usize])
            .to_string_lossy()
            .to_string();
        full_path.rsplit('\\').next().map(|s| s.to_string())
    }
}

/// Finds the visible, titled main window of the process named `exe_name`
/// (case-insensitive).
pub fn find_game_window(exe_name: &str) -> Result<HWND> {
    struct EnumData {
        target: String,
        hwnd: Option<HWND>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() || window_title(hwnd).is_empty() {
                return TRUE;
            }

            match process_name(hwnd) {
                Some(name) if name.to_lowercase() == data.target => {
                    data.hwnd = Some(hwnd);
                    BOOL(0) // Stop enumeration
                }
                _ => TRUE,
            }
        }
    }

    crate::log(&format!("Searching for {} window...", exe_name));
    let mut data = EnumData {
        target: exe_name.to_lowercase(),
        hwnd: None,
    };
    unsafe {
        // EnumWindows reports FALSE when the callback stops it early
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
    }

    let hwnd = data
        .hwnd
        .ok_or_else(|| anyhow!("Could not find {} window. Is the game running?", exe_name))?;
    crate::log(&format!("Found window \"{}\"", window_title(hwnd)));
    Ok(hwnd)
}

/// Restores the window if minimised and brings it to the foreground.
pub fn focus_window(hwnd: HWND) {
    unsafe {
        if IsIconic(hwnd).as_bool() {
            let _ = ShowWindow(hwnd, SW_RESTORE);
        }
        let _ = SetForegroundWindow(hwnd);
    }
    std::thread::sleep(std::time::Duration::from_millis(300));
}

/// Client area in screen coordinates.
pub fn client_screen_rect(hwnd: HWND) -> Result<ScreenRect> {
    let mut client_rect = RECT::default();
    unsafe { GetClientRect(hwnd, &mut client_rect)? };

    let mut origin = POINT { x: 0, y: 0 };
    unsafe {
        if !ClientToScreen(hwnd, &mut origin).as_bool() {
            return Err(anyhow!("ClientToScreen failed"));
        }
    }

    Ok(ScreenRect::new(
        origin.x,
        origin.y,
        client_rect.right - client_rect.left,
        client_rect.bottom - client_rect.top,
    ))
}

/// Full window rectangle (including borders) in screen coordinates.
pub fn window_screen_rect(hwnd: HWND) -> Result<ScreenRect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect)? };
    Ok(ScreenRect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
}

/// True when the foreground window title looks like the game.
pub fn game_in_foreground() -> bool {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0.is_null() {
        return false;
    }
    window_title(hwnd).to_lowercase().contains(GAME_TITLE)
}
