//! Tooltip text recognition.
//!
//! `TesseractTileReader` preprocesses the tooltip capture, runs the Tesseract
//! CLI and corrects the text against the item catalog.

pub mod engine;
pub mod preprocess;
pub mod setup;

pub use setup::{TesseractPaths, ensure_tesseract};

use anyhow::Result;
use image::RgbaImage;

use crate::catalog::Catalog;
use engine::recognize_text;
use preprocess::prepare_for_ocr;

/// Outcome of reading one tooltip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileReadResult {
    /// Catalog name, or empty when the text could not be resolved
    pub corrected_text: String,
    /// OCR text after cutting the "Volume:" line
    pub raw_text: String,
    /// True when `corrected_text` is a catalog entry
    pub matched: bool,
}

/// Turns a tooltip capture into a name.
pub trait TileTextReader {
    fn read_tile(&mut self, image: &RgbaImage) -> Result<TileReadResult>;
}

impl<T: TileTextReader + ?Sized> TileTextReader for Box<T> {
    fn read_tile(&mut self, image: &RgbaImage) -> Result<TileReadResult> {
        (**self).read_tile(image)
    }
}

pub struct TesseractTileReader {
    paths: TesseractPaths,
    catalog: Catalog,
    upscale: u32,
}

impl TesseractTileReader {
    pub fn new(paths: TesseractPaths, catalog: Catalog, upscale: u32) -> Self {
        Self {
            paths,
            catalog,
            upscale,
        }
    }
}

impl TileTextReader for TesseractTileReader {
    fn read_tile(&mut self, image: &RgbaImage) -> Result<TileReadResult> {
        let prepared = prepare_for_ocr(image, self.upscale);
        let text = recognize_text(&prepared, &self.paths)?;
        Ok(self.catalog.correct(&text))
    }
}

/// Reader for the debug bypass, which never looks at tooltips.
pub struct NoTextReader;

impl TileTextReader for NoTextReader {
    fn read_tile(&mut self, _image: &RgbaImage) -> Result<TileReadResult> {
        Ok(TileReadResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_reader_delegates() {
        let mut reader: Box<dyn TileTextReader> = Box::new(NoTextReader);
        let result = reader.read_tile(&RgbaImage::new(4, 4)).unwrap();
        assert_eq!(result, TileReadResult::default());
    }
}
