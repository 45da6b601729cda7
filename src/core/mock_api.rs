use crate::core::{GenerateRequest, GenerateResponse, ImageGenerator, Result};
use crate::utils::error::GenError;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;
const PLACEHOLDER_SIZE: u32 = 512;

pub const OVERLOADED_MESSAGE: &str = "Model overloaded";

#[derive(Debug, Clone, PartialEq)]
pub struct MockSettings {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Probability in `[0, 1]` that a call fails with a transient error.
    pub failure_rate: f64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(2000),
            failure_rate: 0.2,
        }
    }
}

/// Simulated generation backend: sleeps, sometimes reports an overloaded
/// model, otherwise fabricates a placeholder render.
pub struct MockImageGenerator {
    settings: MockSettings,
    rng: Mutex<StdRng>,
}

impl MockImageGenerator {
    pub fn new(settings: MockSettings) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(settings: MockSettings, seed: u64) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    fn pick_delay(&self) -> Duration {
        let MockSettings {
            min_delay,
            max_delay,
            ..
        } = self.settings;
        if max_delay <= min_delay {
            return min_delay;
        }
        self.with_rng(|rng| rng.gen_range(min_delay..max_delay))
    }

    fn should_fail(&self) -> bool {
        let rate = self.settings.failure_rate;
        if rate <= 0.0 {
            return false;
        }
        self.with_rng(|rng| rng.gen::<f64>() < rate)
    }

    fn next_id(&self) -> String {
        let suffix: String = self.with_rng(|rng| {
            (0..ID_SUFFIX_LEN)
                .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
                .collect()
        });
        format!("gen_{}_{}", Utc::now().timestamp_millis(), suffix)
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new(MockSettings::default())
    }
}

pub fn placeholder_image_url(style: crate::core::Style) -> String {
    format!(
        "https://via.placeholder.com/{size}x{size}/{color}/ffffff?text={text}",
        size = PLACEHOLDER_SIZE,
        color = style.placeholder_color(),
        text = style.id().to_ascii_uppercase(),
    )
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        let delay = self.pick_delay();
        tracing::debug!("Simulating generation for {:?} ({:?})", request.style, delay);

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Simulated generation aborted");
                return Err(GenError::Aborted);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if self.should_fail() {
            tracing::debug!("Simulated generation failed: {}", OVERLOADED_MESSAGE);
            return Err(GenError::transient(OVERLOADED_MESSAGE));
        }

        Ok(GenerateResponse {
            id: self.next_id(),
            image_url: placeholder_image_url(request.style),
            prompt: request.prompt.clone(),
            style: request.style,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Style;
    use tokio::time::Instant;

    fn settings(failure_rate: f64) -> MockSettings {
        MockSettings {
            failure_rate,
            ..MockSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_generation_echoes_request() {
        let api = MockImageGenerator::with_seed(settings(0.0), 7);
        let request = GenerateRequest::new("neon skyline", Style::Vintage);
        let started = Instant::now();

        let response = api
            .generate(&request, &CancellationToken::new())
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed <= Duration::from_millis(2001));
        assert_eq!(response.prompt, "neon skyline");
        assert_eq!(response.style, Style::Vintage);
        assert_eq!(
            response.image_url,
            "https://via.placeholder.com/512x512/d4a574/ffffff?text=VINTAGE"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_format() {
        let api = MockImageGenerator::with_seed(settings(0.0), 1);
        let request = GenerateRequest::new("x", Style::Editorial);
        let response = api
            .generate(&request, &CancellationToken::new())
            .await
            .unwrap();

        let parts: Vec<&str> = response.id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "gen");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_reports_overload() {
        let api = MockImageGenerator::with_seed(settings(1.0), 3);
        let request = GenerateRequest::new("x", Style::Artistic);

        let err = api
            .generate(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(err.to_string(), OVERLOADED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_aborts() {
        let api = MockImageGenerator::with_seed(settings(0.0), 5);
        let request = GenerateRequest::new("x", Style::Minimalist);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = api.generate(&request, &cancel).await.unwrap_err();
        assert!(err.is_aborted());
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_when_range_is_empty() {
        let api = MockImageGenerator::with_seed(
            MockSettings {
                min_delay: Duration::from_millis(250),
                max_delay: Duration::from_millis(250),
                failure_rate: 0.0,
            },
            9,
        );
        let started = Instant::now();
        api.generate(
            &GenerateRequest::new("x", Style::Editorial),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(260));
    }
}
