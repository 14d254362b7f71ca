use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersection with a `width` x `height` image, `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Roi> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        let clamped = Roi::new(self.x, self.y, right - self.x, bottom - self.y);
        (!clamped.is_empty()).then_some(clamped)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Roi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected 'x,y,width,height', got '{}'", s));
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a non-negative integer", part))?;
        }

        Ok(Roi::new(values[0], values[1], values[2], values[3]))
    }
}

// 掃描版 RFI 表單的固定座標
pub const DEFAULT_REDACTION_ROI: Roi = Roi::new(1, 136, 86, 21);
pub const DEFAULT_REF_X_ROI: Roi = Roi::new(223, 402, 107, 172);
pub const DEFAULT_REF_Y_ROI: Roi = Roi::new(337, 402, 117, 175);

pub const DEFAULT_THRESHOLD: u8 = 30;
pub const DEFAULT_THRESHOLD_MAX: u8 = 225;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSettings {
    pub level: u8,
    pub max_value: u8,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_THRESHOLD,
            max_value: DEFAULT_THRESHOLD_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    pub redaction: Option<Roi>,
    pub ref_x: Roi,
    pub ref_y: Roi,
    pub threshold: ThresholdSettings,
    pub scale: u32,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            redaction: Some(DEFAULT_REDACTION_ROI),
            ref_x: DEFAULT_REF_X_ROI,
            ref_y: DEFAULT_REF_Y_ROI,
            threshold: ThresholdSettings::default(),
            scale: 1,
        }
    }
}

/// An image file pulled from the inputs, kept in memory until it is processed.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub stem: String,
    pub file_name: String,
    pub origin: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInput {
    pub source: String,
    pub reason: String,
}

impl SkippedInput {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub base_name: String,
    pub images: Vec<SourceImage>,
    pub skipped: Vec<SkippedInput>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrReading {
    pub stem: String,
    pub ref_x: Vec<String>,
    pub ref_y: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RedactedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub origin: String,
    pub reading: OcrReading,
    pub redacted: Option<RedactedImage>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub base_name: String,
    pub readings: Vec<OcrReading>,
    pub redacted_images: Vec<RedactedImage>,
    pub csv_output: Vec<u8>,
    pub skipped: Vec<SkippedInput>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub stem: String,
    pub ref_x_values: usize,
    pub ref_y_values: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub base_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub csv_file: String,
    pub archive_file: Option<String>,
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<SkippedInput>,
}
