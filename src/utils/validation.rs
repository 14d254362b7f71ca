use crate::domain::model::Roi;
use crate::utils::error::{Result, RfiError};
use std::collections::HashSet;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 輸入可以是資料夾（無副檔名），有副檔名時必須在允許清單中
pub fn validate_input_paths<P: AsRef<Path>>(
    field_name: &str,
    paths: &[P],
    allowed_extensions: &[&str],
) -> Result<()> {
    validate_positive_number(field_name, paths.len(), 1)?;

    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for path in paths {
        let path = path.as_ref();
        let display = path.display().to_string();
        validate_path(field_name, &display)?;

        if path.is_dir() {
            continue;
        }

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            let extension = extension.to_ascii_lowercase();
            if !allowed_set.contains(extension.as_str()) {
                return Err(RfiError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: display,
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_roi(field_name: &str, roi: &Roi) -> Result<()> {
    if roi.is_empty() {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: roi.to_string(),
            reason: "ROI width and height must be greater than zero".to_string(),
        });
    }

    if roi.x.checked_add(roi.width).is_none() || roi.y.checked_add(roi.height).is_none() {
        return Err(RfiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: roi.to_string(),
            reason: "ROI extends past the addressable image area".to_string(),
        });
    }

    Ok(())
}
