use crate::domain::model::{Batch, ProcessingSettings, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use image::GrayImage;
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn inputs(&self) -> &[PathBuf];
    fn output_path(&self) -> &str;
    fn base_name(&self) -> Option<&str>;
    fn processing(&self) -> ProcessingSettings;
    fn compress_output(&self) -> bool;
    fn write_summary(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Batch>;
    async fn transform(&self, batch: Batch) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// Turns a preprocessed field crop into raw text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String>;
    fn name(&self) -> &str;
}
