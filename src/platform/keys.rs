//! Global key polling for session control.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, VIRTUAL_KEY, VK_DELETE, VK_ESCAPE, VK_INSERT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotKey {
    /// Insert: start a scan
    Start,
    /// Delete: abort the running scan
    Abort,
    /// Escape: quit the program
    Exit,
}

impl HotKey {
    fn virtual_key(self) -> VIRTUAL_KEY {
        match self {
            HotKey::Start => VK_INSERT,
            HotKey::Abort => VK_DELETE,
            HotKey::Exit => VK_ESCAPE,
        }
    }

    /// True while the key is held down.
    pub fn is_pressed(self) -> bool {
        let state = unsafe { GetAsyncKeyState(self.virtual_key().0 as i32) };
        (state as u16 & 0x8000) != 0
    }
}
