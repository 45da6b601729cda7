use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("Request aborted")]
    Aborted,

    #[error("{message}")]
    Transient { message: String },

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GenError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient { .. } | Self::Timeout => true,
            Self::Api(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Aborted => ErrorSeverity::Low,
            Self::Transient { .. } | Self::Timeout | Self::Api(_) => ErrorSeverity::Medium,
            Self::Rejected { .. }
            | Self::SerializationError(_)
            | Self::ValidationError { .. } => ErrorSeverity::High,
            Self::IoError(_)
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Aborted => "Generation was cancelled.".to_string(),
            Self::Transient { message } => {
                format!("{}. Please try again in a moment.", message)
            }
            Self::Rejected { status, .. } => {
                format!("The generation service refused the request (HTTP {}).", status)
            }
            Self::Timeout => "The generation service did not answer in time.".to_string(),
            Self::Api(_) => "Could not reach the generation service.".to_string(),
            Self::ValidationError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Aborted => "Run the command again when you are ready",
            Self::Transient { .. } | Self::Timeout => {
                "Wait a few seconds and retry, or raise retry.max_attempts"
            }
            Self::Api(_) => "Check the endpoint URL and your network connection",
            Self::Rejected { .. } => "Check the prompt, style and image you sent",
            Self::SerializationError(_) => "The service answered with an unexpected payload",
            Self::IoError(_) => "Check that the file exists and is readable",
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration value and try again"
            }
            Self::ValidationError { .. } => "Provide an image or a prompt, and pick a style",
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
