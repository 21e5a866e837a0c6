use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use thiserror::Error;

use crate::automation::config::PixelRect;

/// Default width of the "light enough to be text" intensity band.
pub const DEFAULT_INK_RANGE: u8 = 40;

/// Pixel value for text after thresholding.
pub const INK: u8 = 0;
/// Pixel value for everything else.
pub const BACKGROUND: u8 = 255;

#[derive(Debug, Error, PartialEq)]
pub enum PreprocessError {
    #[error("cannot preprocess an empty {width}x{height} frame")]
    EmptyFrame { width: u32, height: u32 },
}

/// Converts a frame to binary by keeping only near-white pixels.
///
/// The frame is reduced to intensity first. Pixels whose intensity lies in
/// `[255 - range, 255]` become `INK` (black), everything else becomes
/// `BACKGROUND` (white). The in-game name text is white, so this strips the
/// battle scene behind it and leaves dark text on white for Tesseract.
pub fn isolate_light_text(img: &RgbaImage, range: u8) -> Result<GrayImage, PreprocessError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessError::EmptyFrame { width, height });
    }

    let floor = u8::MAX - range;
    let gray = image::imageops::grayscale(img);

    let mut output: GrayImage = ImageBuffer::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] >= floor { INK } else { BACKGROUND };
        output.put_pixel(x, y, Luma([value]));
    }

    Ok(output)
}

/// Crops a rectangle out of a preprocessed frame.
///
/// Returns `None` when the rectangle does not fit inside the frame.
pub fn crop_rect(img: &GrayImage, rect: &PixelRect) -> Option<GrayImage> {
    let (w, h) = img.dimensions();
    if !rect.fits_within(w, h) {
        return None;
    }
    Some(image::imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gray_pixel(v: u8) -> Rgba<u8> {
        Rgba([v, v, v, 255])
    }

    #[test]
    fn test_isolate_light_text_band() {
        let mut img: RgbaImage = ImageBuffer::new(4, 1);
        img.put_pixel(0, 0, gray_pixel(255));
        img.put_pixel(1, 0, gray_pixel(215));
        img.put_pixel(2, 0, gray_pixel(214));
        img.put_pixel(3, 0, gray_pixel(30));

        let result = isolate_light_text(&img, DEFAULT_INK_RANGE).unwrap();

        assert_eq!(result.get_pixel(0, 0)[0], INK, "White should be ink");
        assert_eq!(result.get_pixel(1, 0)[0], INK, "Band floor should be ink");
        assert_eq!(result.get_pixel(2, 0)[0], BACKGROUND, "Just below the band is background");
        assert_eq!(result.get_pixel(3, 0)[0], BACKGROUND, "Dark should be background");
    }

    #[test]
    fn test_colored_pixel_uses_intensity() {
        // Saturated red is dark once reduced to intensity
        let img: RgbaImage = ImageBuffer::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let result = isolate_light_text(&img, DEFAULT_INK_RANGE).unwrap();
        assert_eq!(result.get_pixel(0, 0)[0], BACKGROUND);
    }

    #[test]
    fn test_preserves_dimensions_and_input() {
        let img: RgbaImage = ImageBuffer::from_pixel(7, 3, gray_pixel(250));
        let before = img.clone();
        let result = isolate_light_text(&img, 10).unwrap();
        assert_eq!(result.dimensions(), (7, 3));
        assert_eq!(img, before);
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let img: RgbaImage = ImageBuffer::new(0, 10);
        assert_eq!(
            isolate_light_text(&img, DEFAULT_INK_RANGE),
            Err(PreprocessError::EmptyFrame { width: 0, height: 10 })
        );
    }

    #[test]
    fn test_crop_rect() {
        let img: GrayImage = ImageBuffer::from_fn(100, 50, |x, y| Luma([(x + y) as u8]));
        let rect = PixelRect { x: 10, y: 20, width: 30, height: 5 };
        let cropped = crop_rect(&img, &rect).unwrap();
        assert_eq!(cropped.dimensions(), (30, 5));
        assert_eq!(cropped.get_pixel(0, 0)[0], 30);
    }

    #[test]
    fn test_crop_rect_out_of_bounds() {
        let img: GrayImage = ImageBuffer::new(100, 50);
        let rect = PixelRect { x: 90, y: 0, width: 20, height: 10 };
        assert!(crop_rect(&img, &rect).is_none());
    }
}
