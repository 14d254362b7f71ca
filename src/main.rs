use clap::Parser;
use rfi_ocr::utils::error::ErrorSeverity;
use rfi_ocr::utils::{logger, validation::Validate};
use rfi_ocr::{BatchEngine, CliConfig, LocalStorage, RfiOcrPipeline, TesseractRecognizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting rfi-ocr CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲、OCR 引擎與管道
    let storage = LocalStorage::new(config.output_path.clone());
    let recognizer = TesseractRecognizer::new(config.ocr_settings());
    let pipeline = RfiOcrPipeline::new(storage, config, recognizer);

    let engine = BatchEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(csv_path) => {
            tracing::info!("✅ RFI OCR batch completed successfully!");
            tracing::info!("📁 CSV saved to: {}", csv_path);
            println!("✅ RFI OCR batch completed successfully!");
            println!("📁 CSV saved to: {}", csv_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ RFI OCR batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
