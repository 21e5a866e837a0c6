//! Multi-region text extraction from a single captured frame.

use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use std::sync::Arc;
use thiserror::Error;

use super::engine::{RecognitionError, TextRecognizer, EMPTY_PAGE};
use super::preprocess::{crop_rect, isolate_light_text, PreprocessError, DEFAULT_INK_RANGE};
use crate::automation::config::{PixelRect, RegionConfig};

/// Outline color for the debug overlay.
pub const COLOR_REGION: Rgba<u8> = Rgba([139, 0, 0, 255]); // Dark red
const REGION_OUTLINE: u32 = 5;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("region '{region}' does not fit inside the {width}x{height} frame")]
    RegionOutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

/// Recognized text per region, in registration order. `None` means the
/// region held no legible text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionResult {
    fields: Vec<(String, Option<String>)>,
}

impl InspectionResult {
    pub fn from_fields(fields: Vec<(String, Option<String>)>) -> Self {
        Self { fields }
    }

    /// Text for `region`. The outer `None` means no such region.
    #[cfg(test)]
    pub fn get(&self, region: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(name, _)| name == region)
            .map(|(_, text)| text.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_deref()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Reads text out of named rectangles of a frame.
pub struct RegionInspector {
    recognizer: Arc<dyn TextRecognizer>,
    regions: Vec<RegionConfig>,
    ink_range: u8,
}

impl RegionInspector {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            regions: Vec::new(),
            ink_range: DEFAULT_INK_RANGE,
        }
    }

    pub fn ink_range(mut self, range: u8) -> Self {
        self.ink_range = range;
        self
    }

    pub fn region(mut self, name: &str, rect: PixelRect) -> Self {
        self.regions.push(RegionConfig::new(name, rect));
        self
    }

    #[cfg(test)]
    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    /// Preprocesses `frame` once, then recognizes every region in order.
    /// Any failure aborts the whole inspection.
    pub fn inspect(&self, frame: RgbaImage) -> Result<InspectionResult, InspectError> {
        let processed = isolate_light_text(&frame, self.ink_range)?;
        drop(frame);

        let mut fields = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            let cropped = self.crop(&processed, region)?;
            let raw = self.recognizer.recognize(&cropped)?;
            crate::log(&format!("OCR '{}': {:?}", region.name, raw));
            fields.push((region.name.clone(), normalize_text(&raw)));
        }

        Ok(InspectionResult::from_fields(fields))
    }

    /// Renders the preprocessed frame with every region outlined.
    pub fn render_regions(&self, frame: &RgbaImage) -> Result<RgbaImage, InspectError> {
        let processed = isolate_light_text(frame, self.ink_range)?;
        let mut overlay = DynamicImage::ImageLuma8(processed).to_rgba8();
        for region in &self.regions {
            let r = region.rect;
            draw_rect(&mut overlay, r, COLOR_REGION, REGION_OUTLINE);
        }
        Ok(overlay)
    }

    fn crop(&self, processed: &GrayImage, region: &RegionConfig) -> Result<GrayImage, InspectError> {
        crop_rect(processed, &region.rect).ok_or_else(|| {
            let (width, height) = processed.dimensions();
            InspectError::RegionOutOfBounds {
                region: region.name.clone(),
                width,
                height,
            }
        })
    }
}

/// Trims recognizer output; the empty-page sentinel and blank text become `None`.
fn normalize_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() || text == EMPTY_PAGE {
        None
    } else {
        Some(text.to_string())
    }
}

/// Draws a rectangle outline, clipped to the image.
pub fn draw_rect(img: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>, thickness: u32) {
    let (img_w, img_h) = img.dimensions();
    let right = rect.x.saturating_add(rect.width).min(img_w);
    let bottom = rect.y.saturating_add(rect.height).min(img_h);
    let thickness = thickness.min(rect.width).min(rect.height);

    for py in rect.y..bottom {
        for px in rect.x..right {
            let on_edge = py < rect.y + thickness
                || py + thickness >= rect.y + rect.height
                || px < rect.x + thickness
                || px + thickness >= rect.x + rect.width;
            if on_edge {
                img.put_pixel(px, py, color);
            }
        }
    }
}
