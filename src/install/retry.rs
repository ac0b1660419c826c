// ABOUTME: Bounded retry for Helm's "another operation is in progress" lock contention.
// ABOUTME: Classification lives in one function so the match pattern is updated in one place.

use crate::helm::HelmError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// True when `message` is Helm's transient release-lock failure, e.g.
/// "another operation (install/upgrade/rollback) is in progress".
pub fn is_stuck_operation(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("another operation") && message.contains("in progress")
}

/// How often a stuck install is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between a stuck attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Exactly one attempt.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("still locked after {attempts} attempt(s): {last}")]
    Stuck {
        attempts: u32,
        #[source]
        last: HelmError,
    },

    #[error(transparent)]
    Failed(HelmError),

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Run `op` until it succeeds, fails with a non-stuck error, or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. No attempt starts once `cancel` has fired.
pub async fn retry_stuck<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, HelmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: attempt });
        }
        attempt += 1;

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if err.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: attempt });
        }
        if !is_stuck_operation(&err.to_string()) {
            return Err(RetryError::Failed(err));
        }
        if attempt >= max_attempts {
            return Err(RetryError::Stuck {
                attempts: attempt,
                last: err,
            });
        }

        tracing::warn!(
            "attempt {}/{} hit a pending Helm operation, retrying",
            attempt,
            max_attempts
        );
        if !policy.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(policy.delay) => {}
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helm_lock_message_is_stuck() {
        assert!(is_stuck_operation(
            "Error: UPGRADE FAILED: another operation (install/upgrade/rollback) is in progress"
        ));
        assert!(is_stuck_operation("Another Operation is IN PROGRESS"));
    }

    #[test]
    fn other_failures_are_not_stuck() {
        assert!(!is_stuck_operation("Error: timed out waiting for the condition"));
        assert!(!is_stuck_operation("another operation failed"));
        assert!(!is_stuck_operation("upgrade in progress"));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        assert_eq!(policy.max_attempts.max(1), 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
