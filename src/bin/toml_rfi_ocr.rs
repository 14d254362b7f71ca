use anyhow::Context;
use clap::Parser;
use rfi_ocr::adapters::tesseract::tesseract_version;
use rfi_ocr::core::ConfigProvider;
use rfi_ocr::utils::error::ErrorSeverity;
use rfi_ocr::utils::{logger, validation::Validate};
use rfi_ocr::{BatchEngine, LocalStorage, RfiOcrPipeline, TesseractRecognizer, TomlConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "toml-rfi-ocr")]
#[command(about = "RFI OCR batch driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "rfi-ocr.toml")]
    config: String,

    /// Replace the input paths listed in the config
    inputs: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, config.json_logs());

    tracing::info!("🚀 Starting TOML-based RFI OCR tool");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if !args.inputs.is_empty() {
        tracing::info!("🔧 Inputs overridden from command line: {:?}", args.inputs);
        config.input.paths = args.inputs.clone();
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).context("dry run failed")?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let recognizer = TesseractRecognizer::new(config.ocr_settings());
    let pipeline = RfiOcrPipeline::new(storage, config, recognizer);

    let engine = BatchEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(csv_path) => {
            tracing::info!("✅ RFI OCR batch completed successfully!");
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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("-")
    );
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Inputs: {} path(s)", config.inputs().len());
    println!("  Output: {}", config.output_path());
    if let Some(base_name) = config.base_name() {
        println!("  Base name: {}", base_name);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📥 Inputs:");
    for path in config.inputs() {
        let state = if path.exists() { "found" } else { "missing" };
        println!("  {} ({})", path.display(), state);
    }

    let processing = config.processing();
    println!();
    println!("🖼️ Regions:");
    match processing.redaction {
        Some(roi) => println!("  Redaction: {}", roi),
        None => println!("  Redaction: disabled"),
    }
    println!("  Ref X: {}", processing.ref_x);
    println!("  Ref Y: {}", processing.ref_y);
    println!(
        "  Threshold: > {} -> 0, else {}",
        processing.threshold.level, processing.threshold.max_value
    );
    if processing.scale > 1 {
        println!("  Upscale: x{}", processing.scale);
    }

    let ocr = config.ocr_settings();
    println!();
    println!("🔤 OCR:");
    println!("  Language: {}  PSM: {}  OEM: {}", ocr.lang, ocr.psm, ocr.oem);
    let version = tesseract_version().context("tesseract is not available on PATH")?;
    println!("  Tesseract: {}", version);

    println!();
    println!("💾 Output:");
    println!("  Folder: {}", config.output_path());
    println!("  ZIP archive: {}", config.compress_output());
    println!("  JSON summary: {}", config.write_summary());

    println!();
    println!("✅ Dry run analysis complete.");

    Ok(())
}
