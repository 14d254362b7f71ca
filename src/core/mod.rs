pub mod document;
pub mod engine;
pub mod imaging;
pub mod report;
pub mod text_cleaner;

pub use crate::domain::model::{Batch, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TextRecognizer};
pub use crate::utils::error::Result;
