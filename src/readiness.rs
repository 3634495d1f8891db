//! Model-readiness polling
//!
//! The backend loads its detection models lazily; camera capture must not
//! start until it reports ready. Polling delays come from one policy object
//! instead of scattered literals: a healthy-but-not-ready backend is polled
//! at the base interval, consecutive errors stretch the delay by the growth
//! factor up to the cap, and any successful response resets the escalation.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::BackendClient;

/// Delay policy for readiness polling
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after a healthy poll, and the first-attempt error delay
    pub base: Duration,
    /// Multiplier applied per consecutive error
    pub factor: f64,
    /// Hard delay ceiling
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            factor: 1.5,
            max: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next poll after `attempt` consecutive errors
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(32)).unwrap_or(32);
        let scaled = self.base.mul_f64(self.factor.powi(exponent));
        scaled.min(self.max)
    }
}

/// Poll the backend until its models report ready
///
/// Returns false if shutdown was requested before readiness.
pub async fn wait_until_ready(
    backend: &BackendClient,
    policy: &BackoffPolicy,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> bool {
    let mut failures: u32 = 0;

    loop {
        let delay = match backend.model_status().await {
            Ok(status) if status.is_ready => {
                tracing::info!("detection models ready");
                return true;
            }
            Ok(status) => {
                failures = 0;
                tracing::debug!(message = ?status.message, "models not ready yet");
                policy.base
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                tracing::warn!(error = %e, failures, "model status check failed");
                policy.delay_for_attempt(failures)
            }
        };

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => return false,
        }
    }
}
