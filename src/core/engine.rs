use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct BatchEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract, transform and load in order and returns the CSV path.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting RFI OCR batch");

        // Extract
        let batch = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} image(s) for '{}'",
            batch.images.len(),
            batch.base_name
        );
        self.monitor.log_stats("Extract");

        // Transform
        let result = self.pipeline.transform(batch).await?;
        let documents = result.readings.len();
        tracing::info!("🔧 Transformed {} document(s)", documents);
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats(documents);

        Ok(output_path)
    }
}
