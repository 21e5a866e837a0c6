use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::setup::TesseractPaths;

/// What Tesseract reports for an image with no recognizable text.
pub const EMPTY_PAGE: &str = "Empty page!!";

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR engine is not available: {0}")]
    EngineMissing(String),
    #[error("OCR I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write OCR input image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Tesseract failed: {0}")]
    EngineFailed(String),
}

/// Turns an image into raw text.
///
/// Implementations return [`EMPTY_PAGE`] when they find nothing. Any other
/// string is free-form and may be wrong.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, RecognitionError>;
}

/// Runs the Tesseract executable on a temporary PNG, one line of text per image.
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(paths: TesseractPaths, language: &str) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: language.to_string(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, RecognitionError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("7") // Treat the image as a single text line
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(RecognitionError::EngineFailed(stderr.trim().to_string()));
        }

        Ok(interpret_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// The CLI prints nothing on stdout for an empty page (the sentinel only goes
/// to stderr), so blank stdout maps to the sentinel.
fn interpret_output(stdout: &str) -> String {
    let text = stdout.trim();
    if text.is_empty() {
        return EMPTY_PAGE.to_string();
    }
    text.to_string()
}

/// Recognizer used when Tesseract could not be set up. Every call fails with
/// the setup error so the operator sees why analysis is not possible.
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<String, RecognitionError> {
        Err(RecognitionError::EngineMissing(self.reason.clone()))
    }
}
