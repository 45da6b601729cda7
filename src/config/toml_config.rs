use crate::core::fallback::FallbackGenerator;
use crate::core::http_api::HttpImageGenerator;
use crate::core::mock_api::{MockImageGenerator, MockSettings};
use crate::core::retry::{RetryPolicy, RetryableService};
use crate::core::ImageGenerator;
use crate::utils::error::{GenError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub retry: RetryConfig,
    pub mock: MockConfig,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub failure_rate: f64,
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 2000,
            failure_rate: 0.2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl StudioConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GenError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GenError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the variable's value; unknown variables are left untouched.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: self.retry.max_delay_ms.map(Duration::from_millis),
        }
    }

    pub fn mock_settings(&self) -> MockSettings {
        MockSettings {
            min_delay: Duration::from_millis(self.mock.min_delay_ms),
            max_delay: Duration::from_millis(self.mock.max_delay_ms),
            failure_rate: self.mock.failure_rate,
        }
    }

    fn mock_generator(&self) -> MockImageGenerator {
        match self.mock.seed {
            Some(seed) => MockImageGenerator::with_seed(self.mock_settings(), seed),
            None => MockImageGenerator::new(self.mock_settings()),
        }
    }

    /// Simulated backend alone, or the HTTP backend with a simulated fallback
    /// when `[http]` is configured.
    pub fn build_generator(&self) -> Box<dyn ImageGenerator> {
        match &self.http {
            Some(http) => {
                let primary = HttpImageGenerator::new(http.endpoint.clone());
                tracing::info!(
                    "🌐 Using {} (simulated fallback after {}ms)",
                    primary.endpoint(),
                    http.timeout_ms
                );
                Box::new(FallbackGenerator::with_timeout(
                    primary,
                    self.mock_generator(),
                    Duration::from_millis(http.timeout_ms),
                ))
            }
            None => {
                tracing::info!("🧪 Using simulated generation backend");
                Box::new(self.mock_generator())
            }
        }
    }

    pub fn build_service(&self) -> RetryableService<Box<dyn ImageGenerator>> {
        RetryableService::with_policy(self.build_generator(), self.retry_policy())
    }
}

impl Validate for StudioConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number(
            "retry.max_attempts",
            u64::from(self.retry.max_attempts),
            1,
        )?;
        validation::validate_finite("mock.failure_rate", self.mock.failure_rate)?;
        validation::validate_range("mock.failure_rate", self.mock.failure_rate, 0.0, 1.0)?;

        if self.mock.max_delay_ms < self.mock.min_delay_ms {
            return Err(GenError::InvalidConfigValueError {
                field: "mock.max_delay_ms".to_string(),
                value: self.mock.max_delay_ms.to_string(),
                reason: format!("Must not be below mock.min_delay_ms ({})", self.mock.min_delay_ms),
            });
        }

        if let Some(http) = &self.http {
            validation::validate_url("http.endpoint", &http.endpoint)?;
            validation::validate_positive_number("http.timeout_ms", http.timeout_ms, 1)?;
        }

        Ok(())
    }
}
