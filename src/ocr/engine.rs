use anyhow::{Context, Result, anyhow};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Runs Tesseract on a preprocessed grayscale image and returns the text
/// with lines joined by single spaces.
pub fn recognize_text(img: &GrayImage, paths: &TesseractPaths) -> Result<String> {
    // Save image to temporary file
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())
        .context("Failed to write OCR input image")?;

    let output = Command::new(&paths.executable)
        .arg(temp_input.path())
        .arg("stdout")
        .arg("--tessdata-dir")
        .arg(&paths.tessdata)
        .arg("-l")
        .arg("eng")
        .arg("--psm")
        .arg("6") // Assume single uniform block of text
        .output()
        .with_context(|| format!("Failed to run {}", paths.executable.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
    }

    Ok(join_lines(&String::from_utf8_lossy(&output.stdout)))
}

/// Collapses multi-line output into one line.
pub fn join_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_lines() {
        // Tesseract ends its output with a form feed
        assert_eq!(
            join_lines("Oracle Helmet\n  Black \n\nVolume: 0.5 SCU\n\x0c"),
            "Oracle Helmet Black Volume: 0.5 SCU"
        );
    }
}
