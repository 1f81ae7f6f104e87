//! Session wiring: game window, geometry, catalog, OCR and result files.

use anyhow::{Context, Result};
use windows::Win32::Foundation::HWND;

use super::cancel::CancelToken;
use super::config::{ScanConfig, ScanMode, get_config};
use super::geometry::{DEFAULT_RESOLUTION, GeometryProfile, ModeGeometry};
use super::orchestrator::{ScanOptions, ScanOrchestrator, SessionReport};
use super::results::FileResultSink;
use super::state::ScanPhase;
use crate::catalog::Catalog;
use crate::ocr::{NoTextReader, TesseractTileReader, TileTextReader, ensure_tesseract};
use crate::paths::{create_session_dir, resolve_from_exe_dir};
use crate::platform::{WindowsDesktop, client_screen_rect, find_game_window, focus_window};

/// What the user asked for on the command line.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub mode: ScanMode,
    /// Explicit resolution; the game's client area is used when absent
    pub resolution: Option<(i32, i32)>,
    /// Run the scroll calibration with this many drags instead of a scan
    pub scroll_test: Option<u32>,
    pub debug_bypass: bool,
}

/// Outcome of one session.
#[derive(Clone, Debug)]
pub enum SessionOutcome {
    Scan(SessionReport),
    ScrollTest(ScanPhase),
}

/// Runs one scan (or scroll test) against the game window.
pub fn run_session(request: &SessionRequest, cancel: CancelToken) -> Result<SessionOutcome> {
    let config = get_config().clone();

    let hwnd = find_game_window(&config.game_process)?;
    focus_window(hwnd);

    let (width, height) = match request.resolution {
        Some(resolution) => resolution,
        None => match client_screen_rect(hwnd) {
            Ok(rect) if rect.width > 0 && rect.height > 0 => (rect.width, rect.height),
            _ => {
                crate::log("[WARNING] Could not read the game client area, assuming 1920x1080");
                DEFAULT_RESOLUTION
            }
        },
    };
    let geometry = GeometryProfile::initialize(width, height)?;
    let mode = geometry.mode(request.mode, config.profile(request.mode));
    crate::log(&format!(
        "Resolution {}x{} (scale {:.3}), mode {}",
        width, height, geometry.scale, request.mode
    ));

    let session_dir = create_session_dir()?;
    crate::set_session_log(Some(session_dir.join("session.log")));
    crate::log(&format!("Session folder: {}", session_dir.display()));

    let result = run_with_log(hwnd, request, cancel, config, geometry, mode);
    crate::set_session_log(None);
    result
}

fn run_with_log(
    hwnd: HWND,
    request: &SessionRequest,
    cancel: CancelToken,
    config: ScanConfig,
    geometry: GeometryProfile,
    mode: ModeGeometry,
) -> Result<SessionOutcome> {
    let mut options = ScanOptions::from_config(mode, &config);
    options.debug_bypass |= request.debug_bypass;

    let reader: Box<dyn TileTextReader> = if options.debug_bypass || request.scroll_test.is_some() {
        Box::new(NoTextReader)
    } else {
        let paths = ensure_tesseract().context("Tesseract is required for scanning")?;
        let catalog = Catalog::load(&resolve_from_exe_dir(&config.catalog_path));
        Box::new(TesseractTileReader::new(paths, catalog, config.ocr_upscale))
    };

    let sink = FileResultSink::new(
        resolve_from_exe_dir(&config.results_file),
        resolve_from_exe_dir(&config.unmatched_file),
    );

    let desktop = WindowsDesktop::new(hwnd)?;

    let mut orchestrator =
        ScanOrchestrator::new(geometry, options, config, desktop, reader, sink, cancel);

    Ok(match request.scroll_test {
        Some(max_scrolls) => SessionOutcome::ScrollTest(orchestrator.run_scroll_test(max_scrolls)),
        None => SessionOutcome::Scan(orchestrator.run()),
    })
}
