//! Retry-with-backoff around a single cancellable generation call.
//!
//! [`RetryableService`] owns at most one in-flight call. Starting a new call
//! cancels the previous one, and [`RetryableService::abort`] cancels whatever
//! is running. Cancellation is checked both while the backend works and while
//! waiting out a backoff delay; it is reported as [`GenError::Aborted`] and
//! never retried.

use crate::core::{GenerateRequest, GenerateResponse, ImageGenerator, Result};
use crate::utils::error::GenError;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

struct ActiveRequest {
    serial: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Slot {
    next_serial: u64,
    active: Option<ActiveRequest>,
}

fn lock(slot: &Mutex<Slot>) -> std::sync::MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases the active slot when the call ends, including when its future is dropped.
struct SlotLease<'a> {
    slot: &'a Mutex<Slot>,
    serial: u64,
    cancel: CancellationToken,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        self.cancel.cancel();
        let mut slot = lock(self.slot);
        if slot.active.as_ref().is_some_and(|a| a.serial == self.serial) {
            slot.active = None;
        }
    }
}

pub struct RetryableService<G> {
    generator: G,
    policy: RetryPolicy,
    slot: Mutex<Slot>,
}

impl<G: ImageGenerator> RetryableService<G> {
    pub fn new(generator: G) -> Self {
        Self::with_policy(generator, RetryPolicy::default())
    }

    pub fn with_policy(generator: G, policy: RetryPolicy) -> Self {
        Self {
            generator,
            policy,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        lock(&self.slot)
    }

    /// Installs a fresh token, cancelling whichever call held the slot before.
    fn begin(&self) -> SlotLease<'_> {
        let mut slot = self.lock_slot();
        if let Some(previous) = slot.active.take() {
            tracing::debug!("Cancelling superseded request #{}", previous.serial);
            previous.cancel.cancel();
        }
        slot.next_serial += 1;
        let serial = slot.next_serial;
        let cancel = CancellationToken::new();
        slot.active = Some(ActiveRequest {
            serial,
            cancel: cancel.clone(),
        });
        SlotLease {
            slot: &self.slot,
            serial,
            cancel,
        }
    }

    /// Cancels the in-flight call, if any.
    pub fn abort(&self) {
        if let Some(active) = self.lock_slot().active.take() {
            tracing::info!("🛑 Aborting request #{}", active.serial);
            active.cancel.cancel();
        }
    }

    pub fn is_request_active(&self) -> bool {
        self.lock_slot().active.is_some()
    }

    /// Runs `request` with retries.
    ///
    /// `on_retry(attempt, error)` fires after each failed attempt that will be
    /// retried, before the backoff wait. It does not fire for the last attempt,
    /// for non-retryable errors or for aborts.
    pub async fn generate_with_retry<F>(
        &self,
        request: &GenerateRequest,
        mut on_retry: F,
    ) -> Result<GenerateResponse>
    where
        F: FnMut(u32, &GenError) + Send,
    {
        let lease = self.begin();
        self.run_attempts(request, &lease.cancel, &mut on_retry).await
    }

    async fn run_attempts<F>(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
        on_retry: &mut F,
    ) -> Result<GenerateResponse>
    where
        F: FnMut(u32, &GenError) + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(GenError::Aborted);
            }

            let error = match self.generator.generate(request, cancel).await {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!("✅ Generation succeeded on attempt {}", attempt);
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if error.is_aborted() {
                tracing::debug!("Attempt {} aborted, not retrying", attempt);
                return Err(error);
            }
            if !error.is_retryable() {
                tracing::warn!("Attempt {} failed with non-retryable error: {}", attempt, error);
                return Err(error);
            }
            if attempt >= max_attempts {
                tracing::warn!(
                    "❌ All {} attempts failed, last error: {}",
                    max_attempts,
                    error
                );
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                "🔄 Attempt {}/{} failed ({}), retrying in {:?}",
                attempt,
                max_attempts,
                error,
                delay
            );
            on_retry(attempt, &error);

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Aborted during backoff after attempt {}", attempt);
                    return Err(GenError::Aborted);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Style;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Replays scripted outcomes, each after `delay`.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<GenerateResponse>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(delay_ms: u64, outcomes: Vec<Result<GenerateResponse>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                delay: Duration::from_millis(delay_ms),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for Scripted {
        async fn generate(
            &self,
            _request: &GenerateRequest,
            cancel: &CancellationToken,
        ) -> Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                _ = cancel.cancelled() => return Err(GenError::Aborted),
                _ = tokio::time::sleep(self.delay) => {}
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenError::transient("script exhausted")))
        }
    }

    fn ok(id: &str) -> Result<GenerateResponse> {
        Ok(GenerateResponse {
            id: id.to_string(),
            image_url: "https://example.com/x.png".to_string(),
            prompt: "p".to_string(),
            style: Style::Artistic,
            created_at: Utc::now(),
        })
    }

    fn overloaded() -> Result<GenerateResponse> {
        Err(GenError::transient("Model overloaded"))
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new("p", Style::Artistic)
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = RetryPolicy {
            max_delay: Some(Duration::from_millis(1500)),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_skips_callback() {
        let service = RetryableService::new(Scripted::new(10, vec![ok("a")]));
        let mut retries = Vec::new();

        let response = service
            .generate_with_retry(&request(), |attempt, _| retries.push(attempt))
            .await
            .unwrap();

        assert_eq!(response.id, "a");
        assert!(retries.is_empty());
        assert!(!service.is_request_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures_with_backoff() {
        let service = RetryableService::new(Scripted::new(
            0,
            vec![overloaded(), overloaded(), ok("third")],
        ));
        let mut retries = Vec::new();
        let started = Instant::now();

        let response = service
            .generate_with_retry(&request(), |attempt, err| {
                retries.push((attempt, err.to_string()))
            })
            .await
            .unwrap();

        assert_eq!(response.id, "third");
        assert_eq!(
            retries,
            vec![
                (1, "Model overloaded".to_string()),
                (2, "Model overloaded".to_string())
            ]
        );
        // 1s after the first failure, 2s after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let generator = Scripted::new(
            0,
            vec![
                overloaded(),
                Err(GenError::transient("busy")),
                Err(GenError::transient("still busy")),
            ],
        );
        let service = RetryableService::new(generator);
        let mut retries = 0;

        let err = service
            .generate_with_retry(&request(), |_, _| retries += 1)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "still busy");
        assert_eq!(retries, 2);
        assert_eq!(service.generator().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let service = RetryableService::new(Scripted::new(
            0,
            vec![Err(GenError::validation("bad prompt")), ok("never")],
        ));
        let mut retries = 0;

        let err = service
            .generate_with_retry(&request(), |_, _| retries += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, GenError::ValidationError { .. }));
        assert_eq!(retries, 0);
        assert_eq!(service.generator().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_attempt() {
        let service = Arc::new(RetryableService::new(Scripted::new(1_000, vec![ok("a")])));

        let aborter = service.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(aborter.is_request_active());
            aborter.abort();
        });

        let mut retries = 0;
        let err = service
            .generate_with_retry(&request(), |_, _| retries += 1)
            .await
            .unwrap_err();

        assert!(err.is_aborted());
        assert_eq!(retries, 0);
        assert_eq!(service.generator().calls(), 1);
        assert!(!service.is_request_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_backoff() {
        let service = Arc::new(RetryableService::new(Scripted::new(
            100,
            vec![overloaded(), ok("b")],
        )));

        let aborter = service.clone();
        tokio::spawn(async move {
            // First attempt fails at 100ms, backoff runs until 1100ms.
            tokio::time::sleep(Duration::from_millis(500)).await;
            aborter.abort();
        });

        let started = Instant::now();
        let err = service
            .generate_with_retry(&request(), |_, _| {})
            .await
            .unwrap_err();

        assert!(err.is_aborted());
        assert_eq!(service.generator().calls(), 1);
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_call_cancels_earlier_one() {
        let service = Arc::new(RetryableService::new(Scripted::new(
            1_000,
            vec![ok("first"), ok("second")],
        )));

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.generate_with_retry(&request(), |_, _| {}).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = service
            .generate_with_retry(&request(), |_, _| {})
            .await
            .unwrap();
        let first = first.await.unwrap();

        assert!(first.unwrap_err().is_aborted());
        // The aborted call never reached its outcome, so the second call got the first script entry.
        assert_eq!(second.id, "first");
        assert!(!service.is_request_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_call_leaves_newer_call_active() {
        let service = Arc::new(RetryableService::new(Scripted::new(
            1_000,
            vec![ok("only")],
        )));

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.generate_with_retry(&request(), |_, _| {}).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = {
            let service = service.clone();
            tokio::spawn(async move { service.generate_with_retry(&request(), |_, _| {}).await })
        };

        let first = first.await.unwrap();
        assert!(first.unwrap_err().is_aborted());
        assert!(service.is_request_active());

        let second = second.await.unwrap().unwrap();
        assert_eq!(second.id, "only");
        assert!(!service.is_request_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_releases_slot() {
        let service = RetryableService::new(Scripted::new(5_000, vec![ok("late")]));

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            service.generate_with_retry(&request(), |_, _| {}),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!service.is_request_active());
        assert_eq!(service.generator().calls(), 1);
    }

    #[tokio::test]
    async fn test_abort_when_idle_is_noop() {
        let service = RetryableService::new(Scripted::new(0, vec![ok("a")]));
        service.abort();
        assert!(!service.is_request_active());
        let response = service.generate_with_retry(&request(), |_, _| {}).await;
        tokio_test::assert_ok!(response);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let service = RetryableService::with_policy(
            Scripted::new(0, vec![overloaded()]),
            RetryPolicy {
                max_attempts: 0,
                ..RetryPolicy::default()
            },
        );
        let err = service.generate_with_retry(&request(), |_, _| {}).await;
        tokio_test::assert_err!(err);
        assert_eq!(service.generator().calls(), 1);
    }
}
