use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfiError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("ROI {roi} lies outside the {width}x{height} image")]
    RoiOutOfBounds {
        roi: String,
        width: u32,
        height: u32,
    },

    #[error("OCR failed ({engine}): {message}")]
    OcrFailed { engine: String, message: String },

    #[error("Cannot read archive {archive}: {message}")]
    ArchiveError { archive: String, message: String },

    #[error("No image files found in the given inputs")]
    NoImagesFound,

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Imaging,
    Ocr,
    Output,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RfiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RfiError::ConfigValidationError { .. } | RfiError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            RfiError::ZipError(_) | RfiError::ArchiveError { .. } | RfiError::NoImagesFound => {
                ErrorCategory::Input
            }
            RfiError::ImageError(_) | RfiError::RoiOutOfBounds { .. } => ErrorCategory::Imaging,
            RfiError::OcrFailed { .. } => ErrorCategory::Ocr,
            RfiError::CsvError(_) | RfiError::IoError(_) | RfiError::SerializationError(_) => {
                ErrorCategory::Output
            }
            RfiError::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單張影像層級的問題，批次仍可繼續
            RfiError::RoiOutOfBounds { .. } | RfiError::ImageError(_) => ErrorSeverity::Low,
            RfiError::OcrFailed { .. } | RfiError::ZipError(_) | RfiError::ArchiveError { .. } => {
                ErrorSeverity::Medium
            }
            RfiError::ConfigValidationError { .. }
            | RfiError::InvalidConfigValueError { .. }
            | RfiError::NoImagesFound
            | RfiError::ProcessingError { .. }
            | RfiError::CsvError(_)
            | RfiError::SerializationError(_) => ErrorSeverity::High,
            RfiError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RfiError::ConfigValidationError { .. } | RfiError::InvalidConfigValueError { .. } => {
                "Check the command line flags or the TOML configuration file"
            }
            RfiError::RoiOutOfBounds { .. } => {
                "Check the ROI coordinates against the scan resolution"
            }
            RfiError::OcrFailed { .. } => {
                "Make sure the `tesseract` binary and the requested language data are installed and on PATH"
            }
            RfiError::NoImagesFound => {
                "Pass image files (png, jpg, jpeg, bmp, tif, tiff, gif), folders or .zip/.7z archives"
            }
            RfiError::ZipError(_) | RfiError::ArchiveError { .. } => {
                "Re-create the archive as a standard .zip or .7z file"
            }
            RfiError::ImageError(_) => "Re-export the scan as PNG or JPEG",
            RfiError::IoError(_) => "Check file permissions and available disk space",
            RfiError::CsvError(_) | RfiError::SerializationError(_) => {
                "Check that the output directory is writable"
            }
            RfiError::ProcessingError { .. } => "Re-run with --verbose and inspect the logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RfiError::NoImagesFound => "No scans to process were found".to_string(),
            RfiError::OcrFailed { message, .. } => format!("Text recognition failed: {}", message),
            RfiError::RoiOutOfBounds { roi, .. } => {
                format!("The region {} does not fit on the scanned page", roi)
            }
            RfiError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RfiError>;
