//! Inventory scan engine.
//!
//! This module walks the inventory grid of the game:
//! - Geometry scaled from the 1920x1080 layout
//! - Scrollbar thumb detection and drag distance calculation
//! - The scan state machine with per-tile retries
//! - Aggregated counts and their files
//!
//! The engine talks to the screen through the `Desktop` trait, so it runs the
//! same against the Win32 backend and the simulated inventory used in tests.

pub mod cancel;
pub mod config;
pub mod desktop;
pub mod detection;
pub mod geometry;
pub mod orchestrator;
pub mod results;
pub mod scroll_math;
pub mod scrollbar;
pub mod state;

#[cfg(windows)]
pub mod runner;

#[cfg(test)]
mod sim;

pub use cancel::{CancelToken, ScanAborted};
pub use config::{ScanConfig, ScanMode, get_config, init_config};
pub use desktop::{Desktop, ScreenRect};
pub use geometry::GeometryProfile;
pub use orchestrator::{ScanOptions, ScanOrchestrator, SessionReport};
pub use results::{AggregateResults, FileResultSink, ResultSink};
pub use state::ScanPhase;
