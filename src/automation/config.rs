//! Configuration for the companion.
//!
//! Loads settings from config.json at startup. Provides the target window
//! title, catalog location, OCR regions and timing parameters.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::paths::{get_exe_dir, resolve_from_exe_dir};

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<CompanionConfig> = OnceLock::new();

/// A rectangle in absolute client-area pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the rectangle is non-empty and lies inside a `width`x`height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

/// A named OCR region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    #[serde(flatten)]
    pub rect: PixelRect,
}

impl RegionConfig {
    pub fn new(name: &str, rect: PixelRect) -> Self {
        Self {
            name: name.to_string(),
            rect,
        }
    }
}

/// Complete companion configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Exact title of the game window
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Catalog JSON, relative to the executable unless absolute
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    /// Delay between automatic updates (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Width of the intensity band treated as text
    #[serde(default = "default_ink_range")]
    pub ink_range: u8,
    /// Tesseract language (traineddata name)
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Name plates to read, in display order
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionConfig>,
    /// How often to check whether the game window is still open (milliseconds)
    #[serde(default = "default_window_check_interval_ms")]
    pub window_check_interval_ms: u64,
}

fn default_window_title() -> String {
    "Pokemon Uranium".to_string()
}

fn default_catalog_path() -> String {
    "UraniumPokedex.json".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ink_range() -> u8 {
    crate::ocr::preprocess::DEFAULT_INK_RANGE
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_regions() -> Vec<RegionConfig> {
    vec![
        RegionConfig::new("Opponent 1", PixelRect::new(20, 5, 215, 70)),
        RegionConfig::new("Ally 1", PixelRect::new(650, 385, 215, 70)),
    ]
}

fn default_window_check_interval_ms() -> u64 {
    500
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            catalog_path: default_catalog_path(),
            poll_interval_ms: default_poll_interval_ms(),
            ink_range: default_ink_range(),
            ocr_language: default_ocr_language(),
            regions: default_regions(),
            window_check_interval_ms: default_window_check_interval_ms(),
        }
    }
}

impl CompanionConfig {
    /// Catalog path with relative paths resolved against the exe dir.
    pub fn resolved_catalog_path(&self) -> PathBuf {
        resolve_from_exe_dir(Path::new(&self.catalog_path))
    }
}

/// Parses config.json contents. Missing fields take their defaults.
fn parse_config(contents: &str) -> serde_json::Result<CompanionConfig> {
    serde_json::from_str(contents)
}

/// Loads configuration from config.json or returns defaults.
/// Looks for config.json in the same directory as the executable.
fn load_config() -> CompanionConfig {
    let config_path = get_exe_dir().join("config.json");

    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match parse_config(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    CompanionConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration, loading it on first use
/// if `init_config()` was not called.
pub fn get_config() -> &'static CompanionConfig {
    CONFIG.get_or_init(load_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within() {
        let rect = PixelRect::new(20, 5, 215, 70);
        assert!(rect.fits_within(240, 480));
        assert!(rect.fits_within(235, 75));
        assert!(!rect.fits_within(234, 75));
        assert!(!rect.fits_within(235, 74));
    }

    #[test]
    fn test_fits_within_rejects_empty_and_overflow() {
        assert!(!PixelRect::new(0, 0, 0, 10).fits_within(100, 100));
        assert!(!PixelRect::new(u32::MAX, 0, 2, 2).fits_within(u32::MAX, 100));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config(r#"{ "poll_interval_ms": 1000 }"#).unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.window_title, "Pokemon Uranium");
        assert_eq!(config.ink_range, 40);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.regions[0].name, "Opponent 1");
    }

    #[test]
    fn test_regions_are_flat_objects() {
        let config = parse_config(
            r#"{ "regions": [ { "name": "Opponent 2", "x": 1, "y": 2, "width": 3, "height": 4 } ] }"#,
        )
        .unwrap();
        assert_eq!(
            config.regions,
            vec![RegionConfig::new("Opponent 2", PixelRect::new(1, 2, 3, 4))]
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(parse_config("{ not json").is_err());
    }
}
