#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{HttpConfig, StudioConfig};

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "genstudio")]
#[command(about = "Generate styled images with retries, backoff and cancellation")]
pub struct CliConfig {
    /// Text prompt describing the image
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Style id (editorial, streetwear, vintage, minimalist, artistic)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Source image file (png, jpg, gif, webp)
    #[arg(short, long)]
    pub image: Option<std::path::PathBuf>,

    /// Number of generations to run one after another
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Real generation endpoint; the simulated backend takes over on timeout
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Timeout before falling back to the simulated backend, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Total attempts per generation
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Simulated failure probability between 0 and 1
    #[arg(long)]
    pub failure_rate: Option<f64>,

    /// List the available styles and exit
    #[arg(long)]
    pub list_styles: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the file configuration, if any, and applies command line overrides on top.
    pub fn resolve(&self) -> crate::utils::error::Result<StudioConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                StudioConfig::from_file(path)?
            }
            None => StudioConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            let timeout_ms = config
                .http
                .as_ref()
                .map(|h| h.timeout_ms)
                .unwrap_or(10_000);
            config.http = Some(HttpConfig {
                endpoint: endpoint.clone(),
                timeout_ms,
            });
        }
        if let (Some(timeout_ms), Some(http)) = (self.timeout_ms, config.http.as_mut()) {
            http.timeout_ms = timeout_ms;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(failure_rate) = self.failure_rate {
            config.mock.failure_rate = failure_rate;
        }

        Ok(config)
    }
}
