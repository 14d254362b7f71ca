// Adapters layer: concrete implementations for external systems (file system, archives, OCR engine).

pub mod archive;
pub mod storage;
pub mod tesseract;

pub use archive::collect_inputs;
pub use storage::LocalStorage;
pub use tesseract::{OcrSettings, TesseractRecognizer};
