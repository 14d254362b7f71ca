use crate::adapters::archive::collect_inputs;
use crate::core::document::process_document;
use crate::core::report::{merge_readings, write_side_by_side_csv};
use crate::domain::model::{
    Batch, DocumentSummary, RedactedImage, RunSummary, SkippedInput, TransformResult,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TextRecognizer};
use crate::utils::error::{Result, RfiError};
use chrono::Utc;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

/// Scanned RFI pages in, redacted copies plus a Ref X / Ref Y CSV out.
pub struct RfiOcrPipeline<S: Storage, C: ConfigProvider, R: TextRecognizer + 'static> {
    storage: S,
    config: C,
    recognizer: Arc<R>,
}

impl<S: Storage, C: ConfigProvider, R: TextRecognizer + 'static> RfiOcrPipeline<S, C, R> {
    pub fn new(storage: S, config: C, recognizer: R) -> Self {
        Self {
            storage,
            config,
            recognizer: Arc::new(recognizer),
        }
    }

    fn output_folder(base_name: &str) -> String {
        format!("{}_output", base_name)
    }
}

/// 攤平後同名檔案只保留最後一個，位置沿用第一次出現的順序
fn dedupe_by_file_name(images: &[RedactedImage]) -> Vec<&RedactedImage> {
    let mut unique: Vec<&RedactedImage> = Vec::with_capacity(images.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for image in images {
        match index.get(image.file_name.as_str()) {
            Some(&position) => {
                tracing::warn!(
                    "⚠️ {} appears more than once, the later copy overwrites the earlier one",
                    image.file_name
                );
                unique[position] = image;
            }
            None => {
                index.insert(image.file_name.as_str(), unique.len());
                unique.push(image);
            }
        }
    }

    unique
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, R: TextRecognizer + 'static> Pipeline
    for RfiOcrPipeline<S, C, R>
{
    async fn extract(&self) -> Result<Batch> {
        let inputs: Vec<PathBuf> = self.config.inputs().to_vec();
        let output_root = PathBuf::from(self.config.output_path());
        let base_name = self.config.base_name().map(str::to_string);

        tracing::debug!("Collecting scans from {} input(s)", inputs.len());

        tokio::task::spawn_blocking(move || {
            collect_inputs(&inputs, Some(output_root.as_path()), base_name.as_deref())
        })
        .await
        .map_err(|e| RfiError::ProcessingError {
            message: format!("Input collection task failed: {}", e),
        })?
    }

    async fn transform(&self, batch: Batch) -> Result<TransformResult> {
        let settings = self.config.processing();
        let total = batch.images.len();
        let mut readings = Vec::with_capacity(total);
        let mut redacted_images = Vec::with_capacity(total);
        let mut skipped = batch.skipped;

        tracing::info!("🔧 Running OCR on {} image(s)", total);

        for (i, source) in batch.images.into_iter().enumerate() {
            let recognizer = Arc::clone(&self.recognizer);
            let settings = settings.clone();
            let origin = source.origin.clone();

            // 影像解碼與 tesseract 呼叫都是阻塞操作
            let outcome = tokio::task::spawn_blocking(move || {
                process_document(&source, &settings, recognizer.as_ref())
            })
            .await;

            match outcome {
                Ok(Ok(document)) => {
                    tracing::info!(
                        "🖼️ [{}/{}] {}: {} Ref X, {} Ref Y",
                        i + 1,
                        total,
                        document.origin,
                        document.reading.ref_x.len(),
                        document.reading.ref_y.len()
                    );
                    readings.push(document.reading);
                    if let Some(redacted) = document.redacted {
                        redacted_images.push(redacted);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("⚠️ [{}/{}] {} failed: {}", i + 1, total, origin, e);
                    tracing::debug!("💡 {}", e.recovery_suggestion());
                    skipped.push(SkippedInput::new(origin, e.to_string()));
                }
                Err(e) => {
                    tracing::error!("❌ [{}/{}] {} worker failed: {}", i + 1, total, origin, e);
                    skipped.push(SkippedInput::new(origin, format!("worker failed: {}", e)));
                }
            }
        }

        if readings.is_empty() {
            return Err(RfiError::ProcessingError {
                message: format!("None of the {} image(s) could be processed", total),
            });
        }

        let readings = merge_readings(readings);
        let csv_output = write_side_by_side_csv(&readings)?;

        tracing::info!(
            "✅ OCR complete: {} document(s), {} skipped",
            readings.len(),
            skipped.len()
        );

        Ok(TransformResult {
            base_name: batch.base_name,
            readings,
            redacted_images,
            csv_output,
            skipped,
            started_at: batch.started_at,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let folder = Self::output_folder(&result.base_name);
        let csv_name = format!("{}.csv", result.base_name);
        let images = dedupe_by_file_name(&result.redacted_images);

        tracing::info!("💾 Writing {} redacted image(s) to {}", images.len(), folder);
        for image in &images {
            self.storage
                .write_file(&format!("{}/{}", folder, image.file_name), &image.bytes)
                .await?;
        }

        self.storage
            .write_file(&format!("{}/{}", folder, csv_name), &result.csv_output)
            .await?;

        let archive_name = if self.config.compress_output() {
            let zip_name = format!("{}.zip", folder);
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

                for image in &images {
                    zip.start_file::<_, ()>(image.file_name.as_str(), FileOptions::default())?;
                    zip.write_all(&image.bytes)?;
                }

                zip.start_file::<_, ()>(csv_name.as_str(), FileOptions::default())?;
                zip.write_all(&result.csv_output)?;

                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&zip_name, &zip_data).await?;
            tracing::info!("📦 Archive saved: {}", zip_name);
            Some(zip_name)
        } else {
            None
        };

        if self.config.write_summary() {
            let summary = RunSummary {
                base_name: result.base_name.clone(),
                started_at: result.started_at,
                finished_at: Utc::now(),
                csv_file: format!("{}/{}", folder, csv_name),
                archive_file: archive_name,
                documents: result
                    .readings
                    .iter()
                    .map(|r| DocumentSummary {
                        stem: r.stem.clone(),
                        ref_x_values: r.ref_x.len(),
                        ref_y_values: r.ref_y.len(),
                    })
                    .collect(),
                skipped: result.skipped.clone(),
            };
            let json = serde_json::to_vec_pretty(&summary)?;
            self.storage
                .write_file(&format!("{}_summary.json", result.base_name), &json)
                .await?;
        }

        let csv_path = Path::new(self.config.output_path())
            .join(&folder)
            .join(&csv_name);
        Ok(csv_path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OcrReading, ProcessingSettings, SourceImage};
    use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
    use std::io::{Cursor, Read};
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<AsyncMutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(AsyncMutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        inputs: Vec<PathBuf>,
        output_path: String,
        base_name: Option<String>,
        compress: bool,
        summary: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                inputs: vec![],
                output_path: "test_output".to_string(),
                base_name: None,
                compress: true,
                summary: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
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
            ProcessingSettings::default()
        }

        fn compress_output(&self) -> bool {
            self.compress
        }

        fn write_summary(&self) -> bool {
            self.summary
        }
    }

    /// Answers Ref X with "0.5" and Ref Y with a header block plus "=0.25".
    struct FixedRecognizer {
        calls: Mutex<usize>,
    }

    impl FixedRecognizer {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }
    }

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _image: &GrayImage) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(if *calls % 2 == 1 {
                "0.5".to_string()
            } else {
                "Ref Y\nmm\n=0.25".to_string()
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn scan(stem: &str, width: u32, height: u32) -> SourceImage {
        let page = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(page)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        SourceImage {
            stem: stem.to_string(),
            file_name: format!("{}.png", stem),
            origin: format!("scans/{}.png", stem),
            bytes,
        }
    }

    fn batch(images: Vec<SourceImage>) -> Batch {
        Batch {
            base_name: "week_12".to_string(),
            images,
            skipped: vec![],
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_transform_collects_readings_and_skips_failures() {
        let pipeline = RfiOcrPipeline::new(MockStorage::new(), MockConfig::new(), FixedRecognizer::new());

        let result = pipeline
            .transform(batch(vec![scan("rfi_001", 640, 800), scan("tiny", 100, 100)]))
            .await
            .unwrap();

        assert_eq!(result.readings.len(), 1);
        assert_eq!(
            result.readings[0],
            OcrReading {
                stem: "rfi_001".to_string(),
                ref_x: vec!["500".to_string()],
                ref_y: vec!["-0.25".to_string()],
            }
        );
        assert_eq!(result.redacted_images.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].source, "scans/tiny.png");

        let csv = String::from_utf8(result.csv_output).unwrap();
        assert_eq!(csv, "Image Stem,Ref X,Ref Y\r\nrfi_001,500,-0.25\r\n\r\n");
    }

    #[tokio::test]
    async fn test_transform_fails_when_nothing_processed() {
        let pipeline = RfiOcrPipeline::new(MockStorage::new(), MockConfig::new(), FixedRecognizer::new());
        let err = pipeline
            .transform(batch(vec![scan("tiny", 50, 50)]))
            .await
            .unwrap_err();
        assert!(matches!(err, RfiError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_load_writes_folder_archive_and_summary() {
        let storage = MockStorage::new();
        let pipeline = RfiOcrPipeline::new(storage.clone(), MockConfig::new(), FixedRecognizer::new());

        let result = pipeline
            .transform(batch(vec![scan("rfi_001", 640, 800)]))
            .await
            .unwrap();
        let csv_path = pipeline.load(result).await.unwrap();

        assert!(csv_path.ends_with("week_12.csv"));
        assert!(storage.get_file("week_12_output/rfi_001.png").await.is_some());
        assert!(storage.get_file("week_12_output/week_12.csv").await.is_some());

        let zip_data = storage.get_file("week_12_output.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut csv = String::new();
        archive
            .by_name("week_12.csv")
            .unwrap()
            .read_to_string(&mut csv)
            .unwrap();
        assert!(csv.starts_with("Image Stem,Ref X,Ref Y"));

        let summary: RunSummary =
            serde_json::from_slice(&storage.get_file("week_12_summary.json").await.unwrap()).unwrap();
        assert_eq!(summary.base_name, "week_12");
        assert_eq!(summary.documents.len(), 1);
        assert_eq!(summary.archive_file.as_deref(), Some("week_12_output.zip"));
    }

    #[tokio::test]
    async fn test_load_without_archive_or_summary() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new();
        config.compress = false;
        config.summary = false;
        let pipeline = RfiOcrPipeline::new(storage.clone(), config, FixedRecognizer::new());

        let result = pipeline
            .transform(batch(vec![scan("rfi_001", 640, 800)]))
            .await
            .unwrap();
        pipeline.load(result).await.unwrap();

        assert!(storage.get_file("week_12_output.zip").await.is_none());
        assert!(storage.get_file("week_12_summary.json").await.is_none());
        assert!(storage.get_file("week_12_output/week_12.csv").await.is_some());
    }

    #[test]
    fn test_dedupe_by_file_name_keeps_later_copy() {
        let images = vec![
            RedactedImage {
                file_name: "scan.png".to_string(),
                bytes: vec![1],
            },
            RedactedImage {
                file_name: "other.png".to_string(),
                bytes: vec![2],
            },
            RedactedImage {
                file_name: "scan.png".to_string(),
                bytes: vec![3],
            },
        ];

        let unique = dedupe_by_file_name(&images);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].bytes, vec![3]);
        assert_eq!(unique[1].file_name, "other.png");
    }
}
