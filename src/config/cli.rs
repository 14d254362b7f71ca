use crate::adapters::archive::accepted_extensions;
use crate::adapters::tesseract::OcrSettings;
use crate::core::ConfigProvider;
use crate::domain::model::{ProcessingSettings, Roi, ThresholdSettings};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_input_paths, validate_non_empty_string, validate_path, validate_range, validate_roi,
    Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "rfi-ocr")]
#[command(about = "Read Ref X / Ref Y values from scanned RFI documents into a CSV")]
pub struct CliConfig {
    /// Image files, folders or .zip/.7z archives to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Name used for the output folder, CSV and archive
    #[arg(long)]
    pub base_name: Option<String>,

    /// Area blacked out on the redacted copies, as x,y,width,height
    #[arg(long, default_value = "1,136,86,21")]
    pub redact_roi: Roi,

    #[arg(long, help = "Do not write redacted copies")]
    pub no_redact: bool,

    #[arg(long, default_value = "223,402,107,172")]
    pub ref_x_roi: Roi,

    #[arg(long, default_value = "337,402,117,175")]
    pub ref_y_roi: Roi,

    /// Pixels brighter than this are treated as background
    #[arg(long, default_value_t = 30)]
    pub threshold: u8,

    #[arg(long, default_value_t = 225)]
    pub max_value: u8,

    /// Integer upscale applied to the fields before OCR
    #[arg(long, default_value_t = 1)]
    pub scale: u32,

    #[arg(long, default_value = "eng")]
    pub lang: String,

    #[arg(long, default_value_t = 11)]
    pub psm: i32,

    #[arg(long, default_value_t = 3)]
    pub oem: i32,

    #[arg(long)]
    pub dpi: Option<i32>,

    #[arg(long, help = "Skip the .zip of the output folder")]
    pub no_zip: bool,

    #[arg(long, help = "Skip the JSON run summary")]
    pub no_summary: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn ocr_settings(&self) -> OcrSettings {
        OcrSettings {
            lang: self.lang.clone(),
            psm: self.psm,
            oem: self.oem,
            dpi: self.dpi,
            variables: HashMap::new(),
        }
    }
}

impl ConfigProvider for CliConfig {
    fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    fn processing(&self) -> ProcessingSettings {
        ProcessingSettings {
            redaction: (!self.no_redact).then_some(self.redact_roi),
            ref_x: self.ref_x_roi,
            ref_y: self.ref_y_roi,
            threshold: ThresholdSettings {
                level: self.threshold,
                max_value: self.max_value,
            },
            scale: self.scale,
        }
    }

    fn compress_output(&self) -> bool {
        !self.no_zip
    }

    fn write_summary(&self) -> bool {
        !self.no_summary
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_input_paths("inputs", &self.inputs, &accepted_extensions())?;
        validate_path("output_path", &self.output_path)?;
        if let Some(base_name) = &self.base_name {
            validate_non_empty_string("base_name", base_name)?;
        }
        if !self.no_redact {
            validate_roi("redact_roi", &self.redact_roi)?;
        }
        validate_roi("ref_x_roi", &self.ref_x_roi)?;
        validate_roi("ref_y_roi", &self.ref_y_roi)?;
        validate_range("scale", self.scale, 1, 8)?;
        validate_non_empty_string("lang", &self.lang)?;
        validate_range("psm", self.psm, 0, 13)?;
        validate_range("oem", self.oem, 0, 3)?;
        if let Some(dpi) = self.dpi {
            validate_range("dpi", dpi, 70, 2400)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DEFAULT_REDACTION_ROI, DEFAULT_REF_X_ROI, DEFAULT_REF_Y_ROI};

    #[test]
    fn test_defaults_match_form_layout() {
        let config = CliConfig::parse_from(["rfi-ocr", "scan.png"]);

        assert_eq!(config.processing(), ProcessingSettings::default());
        assert_eq!(config.redact_roi, DEFAULT_REDACTION_ROI);
        assert_eq!(config.ref_x_roi, DEFAULT_REF_X_ROI);
        assert_eq!(config.ref_y_roi, DEFAULT_REF_Y_ROI);
        assert_eq!(config.ocr_settings(), OcrSettings::default());
        assert!(config.compress_output());
        assert!(config.write_summary());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = CliConfig::parse_from([
            "rfi-ocr",
            "batch.zip",
            "--no-redact",
            "--ref-x-roi",
            "10,20,30,40",
            "--scale",
            "2",
            "--psm",
            "6",
            "--no-zip",
        ]);

        let processing = config.processing();
        assert_eq!(processing.redaction, None);
        assert_eq!(processing.ref_x, Roi::new(10, 20, 30, 40));
        assert_eq!(processing.scale, 2);
        assert_eq!(config.ocr_settings().psm, 6);
        assert!(!config.compress_output());
    }

    #[test]
    fn test_invalid_roi_argument_is_rejected() {
        let parsed = CliConfig::try_parse_from(["rfi-ocr", "scan.png", "--ref-y-roi", "1,2,3"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CliConfig::parse_from(["rfi-ocr", "scan.png"]);
        config.psm = 20;
        assert!(config.validate().is_err());

        let mut config = CliConfig::parse_from(["rfi-ocr", "notes.txt"]);
        assert!(config.validate().is_err());
        config.inputs = vec![PathBuf::from("scan.tiff")];
        config.ref_x_roi = Roi::new(0, 0, 0, 10);
        assert!(config.validate().is_err());
    }
}
