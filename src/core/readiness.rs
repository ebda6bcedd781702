use crate::domain::model::{DeploymentPlan, HealthCheckResult, ServiceSpec};
use crate::domain::ports::HealthProbe;
use crate::utils::error::{Result, StackError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Upper bound on the wait for a single service.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Polls health endpoints until they answer or the attempt budget runs out.
pub struct ReadinessVerifier {
    probe: Arc<dyn HealthProbe>,
    policy: RetryPolicy,
}

impl ReadinessVerifier {
    pub fn new(probe: Arc<dyn HealthProbe>, policy: RetryPolicy) -> Self {
        Self { probe, policy }
    }

    /// Attempts start on a fixed schedule, one every `interval`, and each
    /// attempt is cut off when its slot ends. A service that never answers
    /// therefore costs exactly `max_attempts × interval`, however slowly its
    /// endpoint fails. A zero interval leaves the probe's own timeout in charge.
    pub async fn verify(&self, service: &ServiceSpec) -> HealthCheckResult {
        let max_attempts = self.policy.max_attempts.max(1);
        let slot = self.policy.interval;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let next_attempt_at = Instant::now() + slot;

            match self.attempt(&service.health_url, slot).await {
                Ok(()) => {
                    tracing::info!(
                        "💚 {} is ready (attempt {}/{})",
                        service.name,
                        attempt,
                        max_attempts
                    );
                    return HealthCheckResult {
                        service: service.name.clone(),
                        attempts: attempt,
                        succeeded: true,
                        last_error: None,
                    };
                }
                Err(reason) => {
                    tracing::warn!(
                        "⏳ {} not ready (attempt {}/{}): {}",
                        service.name,
                        attempt,
                        max_attempts,
                        reason
                    );
                    last_error = Some(reason);
                }
            }
            tokio::time::sleep_until(next_attempt_at).await;
        }

        HealthCheckResult {
            service: service.name.clone(),
            attempts: max_attempts,
            succeeded: false,
            last_error,
        }
    }

    async fn attempt(&self, url: &str, slot: Duration) -> std::result::Result<(), String> {
        if slot.is_zero() {
            return self.probe.probe(url).await;
        }
        match tokio::time::timeout(slot, self.probe.probe(url)).await {
            Ok(result) => result,
            Err(_) => Err(format!("no answer within {:?}", slot)),
        }
    }

    /// Verifies services one at a time in plan order and stops at the first
    /// one that never becomes ready. Every result, including the failing
    /// one, is appended to `results`.
    pub async fn verify_plan(
        &self,
        plan: &DeploymentPlan,
        results: &mut Vec<HealthCheckResult>,
    ) -> Result<()> {
        for service in &plan.services {
            tracing::info!("🩺 Waiting for {} at {}", service.name, service.health_url);
            let result = self.verify(service).await;
            let succeeded = result.succeeded;
            results.push(result);

            if !succeeded {
                let failed = &results[results.len() - 1];
                tracing::error!(
                    "❌ {} did not become ready after {} attempts",
                    failed.service,
                    failed.attempts
                );
                return Err(StackError::HealthCheckExhausted {
                    service: failed.service.clone(),
                    attempts: failed.attempts,
                    last_error: failed
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "no response".to_string()),
                });
            }
        }

        Ok(())
    }
}
