use crate::adapters::archive::accepted_extensions;
use crate::adapters::tesseract::{OcrSettings, DEFAULT_LANG, DEFAULT_OEM, DEFAULT_PSM};
use crate::core::ConfigProvider;
use crate::domain::model::{
    ProcessingSettings, Roi, ThresholdSettings, DEFAULT_REDACTION_ROI, DEFAULT_REF_X_ROI,
    DEFAULT_REF_Y_ROI, DEFAULT_THRESHOLD, DEFAULT_THRESHOLD_MAX,
};
use crate::utils::error::{Result, RfiError};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    pub redaction: Option<RedactionConfig>,
    pub regions: Option<RegionsConfig>,
    pub preprocess: Option<PreprocessConfig>,
    pub ocr: Option<OcrConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    pub base_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub roi: Option<Roi>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsConfig {
    pub ref_x: Option<Roi>,
    pub ref_y: Option<Roi>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub threshold: Option<u8>,
    pub max_value: Option<u8>,
    pub scale: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub lang: Option<String>,
    pub psm: Option<i32>,
    pub oem: Option<i32>,
    pub dpi: Option<i32>,
    pub variables: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub compress: Option<bool>,
    pub summary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RfiError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RfiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SCAN_DIR})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_input_paths("input.paths", &self.input.paths, &accepted_extensions())?;
        if let Some(base_name) = &self.input.base_name {
            validation::validate_non_empty_string("input.base_name", base_name)?;
        }
        validation::validate_path("load.output_path", &self.load.output_path)?;

        let processing = self.processing();
        if let Some(roi) = &processing.redaction {
            validation::validate_roi("redaction.roi", roi)?;
        }
        validation::validate_roi("regions.ref_x", &processing.ref_x)?;
        validation::validate_roi("regions.ref_y", &processing.ref_y)?;
        validation::validate_range("preprocess.scale", processing.scale, 1, 8)?;

        let ocr = self.ocr_settings();
        validation::validate_non_empty_string("ocr.lang", &ocr.lang)?;
        validation::validate_range("ocr.psm", ocr.psm, 0, 13)?;
        validation::validate_range("ocr.oem", ocr.oem, 0, 3)?;
        if let Some(dpi) = ocr.dpi {
            validation::validate_range("ocr.dpi", dpi, 70, 2400)?;
        }

        if let Some(format) = self.log_format() {
            if format != "compact" && format != "json" {
                return Err(RfiError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn ocr_settings(&self) -> OcrSettings {
        let ocr = self.ocr.as_ref();
        OcrSettings {
            lang: ocr
                .and_then(|o| o.lang.clone())
                .unwrap_or_else(|| DEFAULT_LANG.to_string()),
            psm: ocr.and_then(|o| o.psm).unwrap_or(DEFAULT_PSM),
            oem: ocr.and_then(|o| o.oem).unwrap_or(DEFAULT_OEM),
            dpi: ocr.and_then(|o| o.dpi),
            variables: ocr.and_then(|o| o.variables.clone()).unwrap_or_default(),
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_format.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format() == Some("json")
    }
}

impl ConfigProvider for TomlConfig {
    fn inputs(&self) -> &[PathBuf] {
        &self.input.paths
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn base_name(&self) -> Option<&str> {
        self.input.base_name.as_deref()
    }

    fn processing(&self) -> ProcessingSettings {
        let redaction = match &self.redaction {
            Some(r) if !r.enabled => None,
            Some(r) => Some(r.roi.unwrap_or(DEFAULT_REDACTION_ROI)),
            None => Some(DEFAULT_REDACTION_ROI),
        };
        let regions = self.regions.as_ref();
        let preprocess = self.preprocess.as_ref();

        ProcessingSettings {
            redaction,
            ref_x: regions.and_then(|r| r.ref_x).unwrap_or(DEFAULT_REF_X_ROI),
            ref_y: regions.and_then(|r| r.ref_y).unwrap_or(DEFAULT_REF_Y_ROI),
            threshold: ThresholdSettings {
                level: preprocess
                    .and_then(|p| p.threshold)
                    .unwrap_or(DEFAULT_THRESHOLD),
                max_value: preprocess
                    .and_then(|p| p.max_value)
                    .unwrap_or(DEFAULT_THRESHOLD_MAX),
            },
            scale: preprocess.and_then(|p| p.scale).unwrap_or(1),
        }
    }

    fn compress_output(&self) -> bool {
        self.load.compress.unwrap_or(true)
    }

    fn write_summary(&self) -> bool {
        self.load.summary.unwrap_or(true)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[pipeline]
name = "rfi-weekly"

[input]
paths = ["./scans"]

[load]
output_path = "./output"
"#;

    #[test]
    fn test_minimal_config_uses_form_defaults() {
        let config = TomlConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.pipeline.name, "rfi-weekly");
        assert_eq!(config.processing(), ProcessingSettings::default());
        assert_eq!(config.ocr_settings(), OcrSettings::default());
        assert!(config.compress_output());
        assert!(config.write_summary());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[pipeline]
name = "rfi-site-b"
description = "Site B scans"
version = "1.2"

[input]
paths = ["./scans", "./late.zip"]
base_name = "site_b"

[redaction]
enabled = true
roi = { x = 0, y = 120, width = 90, height = 30 }

[regions]
ref_x = { x = 220, y = 400, width = 110, height = 180 }

[preprocess]
threshold = 40
scale = 2

[ocr]
lang = "eng+deu"
psm = 6
dpi = 300
variables = { tessedit_char_whitelist = "0123456789.-=" }

[load]
output_path = "./out"
compress = false

[monitoring]
enabled = true
log_format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let processing = config.processing();

        assert_eq!(processing.redaction, Some(Roi::new(0, 120, 90, 30)));
        assert_eq!(processing.ref_x, Roi::new(220, 400, 110, 180));
        assert_eq!(processing.ref_y, DEFAULT_REF_Y_ROI);
        assert_eq!(processing.threshold.level, 40);
        assert_eq!(processing.threshold.max_value, DEFAULT_THRESHOLD_MAX);
        assert_eq!(processing.scale, 2);

        let ocr = config.ocr_settings();
        assert_eq!(ocr.lang, "eng+deu");
        assert_eq!(ocr.psm, 6);
        assert_eq!(ocr.oem, DEFAULT_OEM);
        assert_eq!(ocr.dpi, Some(300));
        assert_eq!(ocr.variables.len(), 1);

        assert_eq!(config.base_name(), Some("site_b"));
        assert!(!config.compress_output());
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redaction_can_be_disabled() {
        let toml_content = format!("{}\n[redaction]\nenabled = false\n", MINIMAL);
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.processing().redaction, None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RFI_TEST_OUTPUT_DIR", "/data/rfi/out");

        let toml_content = r#"
[pipeline]
name = "env"

[input]
paths = ["./scans"]

[load]
output_path = "${RFI_TEST_OUTPUT_DIR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.output_path(), "/data/rfi/out");

        std::env::remove_var("RFI_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = format!("{}\n[ocr]\npsm = 42\n", MINIMAL);
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = format!("{}\n[monitoring]\nenabled = false\nlog_format = \"xml\"\n", MINIMAL);
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[pipeline\nname = 1").unwrap_err();
        assert!(matches!(err, RfiError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "rfi-weekly");
        assert_eq!(config.inputs(), &[PathBuf::from("./scans")]);
    }
}
