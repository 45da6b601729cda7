pub mod fallback;
pub mod history;
pub mod http_api;
pub mod mock_api;
pub mod retry;
pub mod studio;

pub use crate::domain::model::{GenerateRequest, GenerateResponse, HistoryItem, Style};
pub use crate::domain::ports::ImageGenerator;
pub use crate::utils::error::Result;
