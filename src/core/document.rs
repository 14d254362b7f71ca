use crate::core::{imaging, text_cleaner};
use crate::domain::model::{
    OcrReading, ProcessedDocument, ProcessingSettings, RedactedImage, SourceImage,
};
use crate::domain::ports::TextRecognizer;
use crate::utils::error::Result;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Runs one scan through redaction, field preprocessing, OCR and cleaning.
pub fn process_document(
    source: &SourceImage,
    settings: &ProcessingSettings,
    recognizer: &dyn TextRecognizer,
) -> Result<ProcessedDocument> {
    let format = ImageFormat::from_path(&source.file_name).ok();
    let image = match format {
        Some(format) => image::load_from_memory_with_format(&source.bytes, format)
            .or_else(|_| image::load_from_memory(&source.bytes))?,
        None => image::load_from_memory(&source.bytes)?,
    };

    tracing::debug!(
        "Processing {} ({}x{}) with {}",
        source.origin,
        image.width(),
        image.height(),
        recognizer.name()
    );

    // 遮蔽只作用在輸出副本，OCR 使用原始像素
    let redacted = match settings.redaction {
        Some(roi) => {
            let mut copy = image.clone();
            imaging::redact(&mut copy, roi);
            Some(encode_redacted(&copy, &source.file_name, format)?)
        }
        None => None,
    };

    let field_x = imaging::prepare_field(&image, settings.ref_x, settings)?;
    let field_y = imaging::prepare_field(&image, settings.ref_y, settings)?;

    let text_x = recognizer.recognize(&field_x)?;
    let text_y = recognizer.recognize(&field_y)?;

    let (ref_x, ref_y) = text_cleaner::clean_text(&text_x, &text_y);

    Ok(ProcessedDocument {
        origin: source.origin.clone(),
        reading: OcrReading {
            stem: source.stem.clone(),
            ref_x,
            ref_y,
        },
        redacted,
    })
}

/// Encodes in the source format, falling back to PNG when the encoder
/// does not accept the pixel layout.
fn encode_redacted(
    image: &DynamicImage,
    file_name: &str,
    format: Option<ImageFormat>,
) -> Result<RedactedImage> {
    if let Some(format) = format {
        let mut bytes = Vec::new();
        match image.write_to(&mut Cursor::new(&mut bytes), format) {
            Ok(()) => {
                return Ok(RedactedImage {
                    file_name: file_name.to_string(),
                    bytes,
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ Cannot re-encode {} as {:?} ({}), writing PNG", file_name, format, e);
            }
        }
    }

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    let png_name = Path::new(file_name)
        .with_extension("png")
        .to_string_lossy()
        .into_owned();

    Ok(RedactedImage {
        file_name: png_name,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RfiError;
    use image::{GrayImage, Rgb, RgbImage};
    use std::sync::Mutex;

    struct ScriptedRecognizer {
        replies: Mutex<Vec<String>>,
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedRecognizer {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                sizes: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, image: &GrayImage) -> Result<String> {
            self.sizes.lock().unwrap().push(image.dimensions());
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scan_bytes(width: u32, height: u32) -> Vec<u8> {
        let page = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(page)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn source(width: u32, height: u32) -> SourceImage {
        SourceImage {
            stem: "rfi_017".to_string(),
            file_name: "rfi_017.png".to_string(),
            origin: "scans/rfi_017.png".to_string(),
            bytes: scan_bytes(width, height),
        }
    }

    #[test]
    fn test_process_document_reads_both_fields() {
        let recognizer = ScriptedRecognizer::new(&["0.125\n1.5", "Ref Y\nmm\n=0.25\n1.00"]);
        let doc = process_document(&source(640, 800), &ProcessingSettings::default(), &recognizer)
            .unwrap();

        assert_eq!(doc.reading.stem, "rfi_017");
        assert_eq!(doc.reading.ref_x, vec!["125", "1500"]);
        assert_eq!(doc.reading.ref_y, vec!["-0.25"]);
        assert_eq!(*recognizer.sizes.lock().unwrap(), vec![(107, 172), (117, 175)]);

        let redacted = doc.redacted.unwrap();
        assert_eq!(redacted.file_name, "rfi_017.png");
        let decoded = image::load_from_memory(&redacted.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(1, 136).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(300, 300).0, [255, 255, 255]);
    }

    #[test]
    fn test_process_document_without_redaction() {
        let recognizer = ScriptedRecognizer::new(&["", ""]);
        let settings = ProcessingSettings {
            redaction: None,
            ..ProcessingSettings::default()
        };
        let doc = process_document(&source(640, 800), &settings, &recognizer).unwrap();
        assert!(doc.redacted.is_none());
        assert!(doc.reading.ref_x.is_empty());
    }

    #[test]
    fn test_process_document_small_scan_fails() {
        let recognizer = ScriptedRecognizer::new(&[]);
        let err = process_document(&source(200, 200), &ProcessingSettings::default(), &recognizer)
            .unwrap_err();
        assert!(matches!(err, RfiError::RoiOutOfBounds { .. }));
    }

    #[test]
    fn test_process_document_rejects_garbage_bytes() {
        let recognizer = ScriptedRecognizer::new(&[]);
        let mut broken = source(10, 10);
        broken.bytes = b"not an image".to_vec();
        let err = process_document(&broken, &ProcessingSettings::default(), &recognizer)
            .unwrap_err();
        assert!(matches!(err, RfiError::ImageError(_)));
    }
}
