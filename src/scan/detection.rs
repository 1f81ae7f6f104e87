//! Next-page button detection via brightness analysis.
//!
//! The button is lit within a narrow brightness band when another page
//! exists. Darker means disabled; brighter means the probe is looking at
//! background rather than the button.

use image::RgbaImage;

/// Calculates the average brightness (luminance) of an image.
///
/// Uses the ITU-R BT.601 luma formula: Y = 0.299*R + 0.587*G + 0.114*B
/// Returns a value from 0.0 (black) to 255.0 (white).
pub fn calculate_brightness(img: &RgbaImage) -> f32 {
    if img.width() == 0 || img.height() == 0 {
        return 0.0;
    }

    let pixel_count = (img.width() * img.height()) as f64;
    let total: f64 = img
        .pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .sum();

    (total / pixel_count) as f32
}

/// Inclusive brightness band of an active button.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrightnessBand {
    pub min: f32,
    pub max: f32,
}

impl BrightnessBand {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Active,
    TooBright,
    Inactive,
}

impl std::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonState::Active => write!(f, "Active"),
            ButtonState::TooBright => write!(f, "Too bright (background)"),
            ButtonState::Inactive => write!(f, "Inactive"),
        }
    }
}

pub fn classify_button(brightness: f32, band: BrightnessBand) -> ButtonState {
    if brightness >= band.min && brightness <= band.max {
        ButtonState::Active
    } else if brightness > band.max {
        ButtonState::TooBright
    } else {
        ButtonState::Inactive
    }
}

pub fn is_button_active(brightness: f32, band: BrightnessBand) -> bool {
    classify_button(brightness, band) == ButtonState::Active
}
