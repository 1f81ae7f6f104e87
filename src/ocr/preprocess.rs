use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// 3x3 sharpening kernel.
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Prepares a tooltip capture for Tesseract.
///
/// Grayscale, upscale (the tooltip text is only ~12px tall), stretch the
/// contrast to the full range, sharpen, and invert light-on-dark text so the
/// result is dark text on a light background.
pub fn prepare_for_ocr(img: &RgbaImage, upscale: u32) -> GrayImage {
    let gray = imageops::grayscale(img);
    let factor = upscale.max(1);
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray;
    }

    let resized = if factor > 1 {
        imageops::resize(&gray, w * factor, h * factor, FilterType::CatmullRom)
    } else {
        gray
    };

    let stretched = stretch_contrast(&resized);
    let sharpened = imageops::filter3x3(&stretched, &SHARPEN_KERNEL);

    if mean_intensity(&sharpened) < 128.0 {
        let mut inverted = sharpened;
        imageops::invert(&mut inverted);
        inverted
    } else {
        sharpened
    }
}

/// Linearly maps the darkest pixel to 0 and the brightest to 255.
pub fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return img.clone();
    }

    let range = (max - min) as f32;
    let mut output = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let value = ((pixel[0] - min) as f32 * 255.0 / range).round() as u8;
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

fn mean_intensity(img: &GrayImage) -> f64 {
    let count = (img.width() * img.height()) as f64;
    if count == 0.0 {
        return 0.0;
    }
    img.pixels().map(|p| p[0] as f64).sum::<f64>() / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn tooltip() -> RgbaImage {
        // light text stroke on a dark background
        let mut img = RgbaImage::from_pixel(20, 6, Rgba([20, 25, 30, 255]));
        for x in 4..16 {
            img.put_pixel(x, 3, Rgba([220, 220, 220, 255]));
        }
        img
    }

    #[test]
    fn test_upscales() {
        let prepared = prepare_for_ocr(&tooltip(), 6);
        assert_eq!(prepared.dimensions(), (120, 36));
    }

    #[test]
    fn test_dark_background_is_inverted() {
        let prepared = prepare_for_ocr(&tooltip(), 1);
        // background turns light, the stroke dark
        assert!(prepared.get_pixel(0, 0)[0] > 200);
        assert!(prepared.get_pixel(10, 3)[0] < 60);
    }

    #[test]
    fn test_stretch_contrast() {
        let mut img = GrayImage::from_pixel(3, 1, Luma([100]));
        img.put_pixel(1, 0, Luma([150]));
        img.put_pixel(2, 0, Luma([125]));
        let stretched = stretch_contrast(&img);
        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(1, 0)[0], 255);
        assert_eq!(stretched.get_pixel(2, 0)[0], 128);
    }

    #[test]
    fn test_flat_image_is_unchanged() {
        let img = GrayImage::from_pixel(4, 4, Luma([90]));
        assert_eq!(stretch_contrast(&img), img);
    }
}
