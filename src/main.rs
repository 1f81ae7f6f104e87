//! Star Citizen Inventory Scanner
//!
//! Reads the in-game inventory grid by hovering every tile, OCR-reading the
//! tooltip and matching it against a known item catalog. Scrolls by dragging
//! the scrollbar thumb, follows the next-page button and writes the item
//! counts to a text file.
//!
//! Controls while the program runs: Insert starts a scan, Delete aborts it,
//! Escape quits (outside the game window).

mod catalog;
mod ocr;
mod paths;
mod scan;

#[cfg(windows)]
mod platform;

use anyhow::{Result, anyhow};
use chrono::Local;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scan::ScanMode;

const LOG_FILE: &str = "inventory_scanner.log";

/// Per-session log file, set while a scan runs.
static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Logs a message to the console, the log file and the session log.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    append_line(&paths::get_logs_dir().join(LOG_FILE), &line);
    if let Ok(session) = SESSION_LOG.lock() {
        if let Some(path) = session.as_deref() {
            append_line(path, &line);
        }
    }
}

/// Enables (`Some`) or disables (`None`) the per-session log file.
pub fn set_session_log(path: Option<PathBuf>) {
    if let Ok(mut session) = SESSION_LOG.lock() {
        *session = path;
    }
}

#[derive(Parser, Debug)]
#[command(name = "inventory-scanner", version, about = "Scans the Star Citizen inventory")]
struct Cli {
    /// Scan mode: 1 = 1x1 items, 2 = 1x2 undersuits
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    mode: u8,

    /// Screen resolution as WIDTHxHEIGHT (default: the game window size)
    resolution: Option<String>,

    /// Run the scroll calibration with at most N drags instead of a scan
    #[arg(long, value_name = "N")]
    scroll_test: Option<u32>,

    /// Count tiles without OCR
    #[arg(long)]
    debug_bypass: bool,
}

/// Parses `WIDTHxHEIGHT`.
fn parse_resolution(text: &str) -> Result<(i32, i32)> {
    let (w, h) = text
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("Invalid resolution '{}' (expected WIDTHxHEIGHT)", text))?;
    let width: i32 = w.trim().parse()?;
    let height: i32 = h.trim().parse()?;
    if width <= 0 || height <= 0 {
        return Err(anyhow!("Invalid resolution '{}'", text));
    }
    Ok((width, height))
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        append_line(&paths::get_logs_dir().join(LOG_FILE), &log_msg);
    }));

    let cli = Cli::parse();
    paths::ensure_directories()?;
    scan::init_config();

    let mode = ScanMode::from_index(cli.mode)?;
    let resolution = cli.resolution.as_deref().map(parse_resolution).transpose()?;

    run(mode, resolution, cli.scroll_test, cli.debug_bypass)
}

#[cfg(windows)]
fn run(
    mode: ScanMode,
    resolution: Option<(i32, i32)>,
    scroll_test: Option<u32>,
    debug_bypass: bool,
) -> Result<()> {
    use platform::HotKey;
    use scan::runner::{SessionOutcome, SessionRequest, run_session};
    use std::time::Duration;

    const KEY_POLL: Duration = Duration::from_millis(50);

    platform::enable_dpi_awareness();
    unsafe {
        windows::Win32::System::WinRT::RoInitialize(
            windows::Win32::System::WinRT::RO_INIT_MULTITHREADED,
        )?
    };

    let request = SessionRequest {
        mode,
        resolution,
        scroll_test,
        debug_bypass,
    };
    let cancel = scan::CancelToken::with_probe(|| HotKey::Abort.is_pressed());

    log(&format!("Inventory scanner ready - mode {}", mode));
    log("Open the inventory in game, then press INSERT to start.");
    log("DELETE aborts a running scan, ESC quits (outside the game).");

    loop {
        if HotKey::Start.is_pressed() {
            cancel.reset();
            match run_session(&request, cancel.clone()) {
                Ok(SessionOutcome::Scan(report)) => log(&format!(
                    "Session ended: {} - {} items ({} unique), {} unmatched",
                    report.phase, report.total_items, report.unique_items, report.unmatched
                )),
                Ok(SessionOutcome::ScrollTest(phase)) => {
                    log(&format!("Scroll test ended: {}", phase))
                }
                Err(e) => log(&format!("[ERROR] Session could not run: {:#}", e)),
            }
            while HotKey::Start.is_pressed() {
                std::thread::sleep(KEY_POLL);
            }
            log("Press INSERT to scan again, ESC to quit.");
        }

        if HotKey::Exit.is_pressed() && !platform::game_in_foreground() {
            log("Exiting");
            return Ok(());
        }

        std::thread::sleep(KEY_POLL);
    }
}

#[cfg(not(windows))]
fn run(
    mode: ScanMode,
    _resolution: Option<(i32, i32)>,
    _scroll_test: Option<u32>,
    _debug_bypass: bool,
) -> Result<()> {
    log(&format!("Mode {} requested", mode));
    Err(anyhow!("Scanning requires Windows (game window capture and input)"))
}
