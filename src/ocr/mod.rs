//! Text extraction: frame preprocessing, the Tesseract recognizer and
//! multi-region inspection.

pub mod engine;
pub mod inspect;
pub mod preprocess;
pub mod setup;

pub use engine::{TesseractRecognizer, TextRecognizer, UnavailableRecognizer};
pub use inspect::{InspectionResult, RegionInspector};
pub use setup::ensure_tesseract;
