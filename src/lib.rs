pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{LocalStorage, OcrSettings, TesseractRecognizer};
pub use app::pipelines::RfiOcrPipeline;
pub use core::engine::BatchEngine;
pub use utils::error::{Result, RfiError};
