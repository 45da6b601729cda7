pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::StudioConfig;

pub use crate::core::{
    fallback::FallbackGenerator,
    history::GenerationHistory,
    http_api::HttpImageGenerator,
    mock_api::{MockImageGenerator, MockSettings},
    retry::{RetryPolicy, RetryableService},
    studio::{Draft, Studio},
};
pub use domain::model::{GenerateRequest, GenerateResponse, HistoryItem, Style};
pub use domain::ports::ImageGenerator;
pub use tokio_util::sync::CancellationToken;
pub use utils::error::{GenError, Result};
