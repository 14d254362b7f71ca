//! Pixel operations on scanned RFI pages: redaction, field crops and the
//! binarization applied before OCR.

use crate::domain::model::{ProcessingSettings, Roi, ThresholdSettings};
use crate::utils::error::{Result, RfiError};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::map::map_colors;
use imageproc::rect::Rect;

/// Paints `roi` black. Parts outside the image are ignored.
pub fn redact(image: &mut DynamicImage, roi: Roi) {
    let (width, height) = image.dimensions();
    let Some(area) = roi.clamp_to(width, height) else {
        tracing::debug!("Redaction ROI {} is outside {}x{}, skipping", roi, width, height);
        return;
    };

    let rect = Rect::at(area.x as i32, area.y as i32).of_size(area.width, area.height);
    draw_filled_rect_mut(image, rect, Rgba([0, 0, 0, 255]));
}

/// Crops `roi`, trimmed to the image bounds.
pub fn crop(image: &DynamicImage, roi: Roi) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let area = roi
        .clamp_to(width, height)
        .ok_or_else(|| RfiError::RoiOutOfBounds {
            roi: roi.to_string(),
            width,
            height,
        })?;

    if area != roi {
        tracing::debug!("ROI {} trimmed to {} on {}x{} image", roi, area, width, height);
    }

    Ok(image.crop_imm(area.x, area.y, area.width, area.height))
}

/// Grayscale followed by an inverted binary threshold: pixels brighter than
/// `level` become 0, everything else becomes `max_value`.
pub fn binarize(image: &DynamicImage, threshold: ThresholdSettings) -> GrayImage {
    let rgb = image.to_rgb8();
    map_colors(&rgb, |p: Rgb<u8>| {
        if scan_luma(p) > threshold.level {
            Luma([0u8])
        } else {
            Luma([threshold.max_value])
        }
    })
}

// OpenCV COLOR_BGR2GRAY 的 BT.601 定點係數 (總和 1 << 14)，不是 `to_luma8` 的 BT.709
fn scan_luma(p: Rgb<u8>) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    let [r, g, b] = p.0;
    let y = (R * r as u32 + G * g as u32 + B * b as u32 + (1 << 13)) >> 14;
    y as u8
}

pub fn upscale(image: GrayImage, scale: u32) -> GrayImage {
    if scale <= 1 {
        return image;
    }
    let (width, height) = image.dimensions();
    // 最近鄰插值保持二值化結果
    image::imageops::resize(&image, width * scale, height * scale, FilterType::Nearest)
}

/// Crop, binarize and scale one field so it is ready for OCR.
pub fn prepare_field(
    image: &DynamicImage,
    roi: Roi,
    settings: &ProcessingSettings,
) -> Result<GrayImage> {
    let field = crop(image, roi)?;
    let binary = binarize(&field, settings.threshold);
    Ok(upscale(binary, settings.scale))
}
