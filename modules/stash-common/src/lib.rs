pub mod config;
pub mod types;

pub use config::{ExtractConfig, PipelineConfig};
pub use types::*;
