use crate::domain::ports::TextRecognizer;
use crate::utils::error::{Result, RfiError};
use image::{GrayImage, ImageFormat};
use rusty_tesseract::{Args, Image as TesseractImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "eng";
/// Sparse text: the reference fields are loose columns of numbers.
pub const DEFAULT_PSM: i32 = 11;
pub const DEFAULT_OEM: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSettings {
    pub lang: String,
    pub psm: i32,
    pub oem: i32,
    pub dpi: Option<i32>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            psm: DEFAULT_PSM,
            oem: DEFAULT_OEM,
            dpi: None,
            variables: HashMap::new(),
        }
    }
}

impl OcrSettings {
    pub fn to_args(&self) -> Args {
        Args {
            lang: self.lang.clone(),
            config_variables: self.variables.clone(),
            dpi: self.dpi,
            psm: Some(self.psm),
            oem: Some(self.oem),
        }
    }
}

/// OCR through the `tesseract` executable found on PATH.
pub struct TesseractRecognizer {
    args: Args,
}

impl TesseractRecognizer {
    pub fn new(settings: OcrSettings) -> Self {
        tracing::info!(
            "🔤 Tesseract OCR: lang={}, psm={}, oem={}",
            settings.lang,
            settings.psm,
            settings.oem
        );
        Self {
            args: settings.to_args(),
        }
    }

    fn ocr_error(&self, message: impl Into<String>) -> RfiError {
        RfiError::OcrFailed {
            engine: self.name().to_string(),
            message: message.into(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        tracing::debug!(
            "Running tesseract on {}x{} field",
            image.width(),
            image.height()
        );

        // tesseract 只吃檔案，先寫到暫存 PNG
        let field_file = tempfile::Builder::new()
            .prefix("rfi-field-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(field_file.path(), ImageFormat::Png)?;

        let input = TesseractImage::from_path(field_file.path())
            .map_err(|e| self.ocr_error(format!("cannot load field image: {}", e)))?;

        let text = rusty_tesseract::image_to_string(&input, &self.args)
            .map_err(|e| self.ocr_error(e.to_string()))?;

        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Version string of the installed tesseract binary.
pub fn tesseract_version() -> Result<String> {
    rusty_tesseract::get_tesseract_version().map_err(|e| RfiError::OcrFailed {
        engine: "tesseract".to_string(),
        message: e.to_string(),
    })
}
