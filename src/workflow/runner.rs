use crate::config::WorkflowConfig;
use crate::domain::ports::{StepFuture, StepRunner};
use crate::utils::error::{CompareError, Result};
use crate::workflow::history::{StepOutcome, WorkflowJournal};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry policy applied to every workflow step.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            step_timeout: config.step_timeout,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }

    /// Delay after the given failed attempt (1-based), doubling up to the cap.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

/// 工作流步驟執行器：每次嘗試都有時限，失敗後退避重試並寫入執行紀錄
pub struct DurableStepRunner {
    workflow_id: String,
    policy: RetryPolicy,
    journal: Arc<WorkflowJournal>,
}

impl DurableStepRunner {
    pub fn new(workflow_id: impl Into<String>, policy: RetryPolicy, journal: Arc<WorkflowJournal>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            policy,
            journal,
        }
    }
}

#[async_trait]
impl StepRunner for DurableStepRunner {
    async fn run_step<T, F>(&self, step: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> StepFuture<T> + Send + Sync + 'static,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            let error = match tokio::time::timeout(self.policy.step_timeout, op()).await {
                Ok(Ok(value)) => {
                    self.journal
                        .record(&self.workflow_id, step, attempt, StepOutcome::Completed)
                        .await;
                    debug!("✅ {}: step {} completed (attempt {})", self.workflow_id, step, attempt);
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    self.journal
                        .record(
                            &self.workflow_id,
                            step,
                            attempt,
                            StepOutcome::Failed(e.to_string()),
                        )
                        .await;
                    e
                }
                Err(_) => {
                    self.journal
                        .record(&self.workflow_id, step, attempt, StepOutcome::TimedOut)
                        .await;
                    CompareError::StepTimeout {
                        step: step.to_string(),
                        timeout: self.policy.step_timeout,
                    }
                }
            };

            last_error = error.to_string();

            if attempt < self.policy.max_attempts {
                let backoff = self.policy.backoff_for(attempt);
                warn!(
                    workflow_id = %self.workflow_id,
                    step = step,
                    attempt = attempt,
                    max_attempts = self.policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    "Step attempt failed, retrying: {}",
                    error
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Err(CompareError::StepFailed {
            step: step.to_string(),
            attempts: self.policy.max_attempts,
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::history::WorkflowHistory;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32, step_timeout: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            step_timeout,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        }
    }

    async fn runner(policy: RetryPolicy) -> (DurableStepRunner, Arc<WorkflowJournal>) {
        let journal = Arc::new(WorkflowJournal::new());
        journal.begin("wf-test").await;
        (DurableStepRunner::new("wf-test", policy, Arc::clone(&journal)), journal)
    }

    async fn history(journal: &WorkflowJournal) -> WorkflowHistory {
        journal.get("wf-test").await.unwrap()
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (runner, journal) = runner(fast_policy(3, Duration::from_secs(1))).await;
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let value = runner
            .run_step("save_hotels", move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(CompareError::InternalError {
                            message: format!("transient fault {}", n),
                        })
                    } else {
                        Ok(n)
                    }
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        let history = history(&journal).await;
        assert_eq!(history.attempts_for("save_hotels"), 3);
        assert!(history.completed("save_hotels"));
        assert_eq!(
            history.events[0].outcome,
            StepOutcome::Failed("Internal error: transient fault 1".to_string())
        );
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail_the_step() {
        let (runner, journal) = runner(fast_policy(3, Duration::from_secs(1))).await;
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<()> = runner
            .run_step("get_cached_hotels", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(CompareError::InternalError {
                        message: "cache down".to_string(),
                    })
                }
                .boxed()
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(CompareError::StepFailed { step, attempts, message }) => {
                assert_eq!(step, "get_cached_hotels");
                assert_eq!(attempts, 3);
                assert!(message.contains("cache down"));
            }
            other => panic!("expected StepFailed, got {:?}", other),
        }
        assert!(!history(&journal).await.completed("get_cached_hotels"));
    }

    #[tokio::test]
    async fn test_step_deadline_counts_as_failed_attempt() {
        let (runner, journal) = runner(fast_policy(2, Duration::from_millis(50))).await;
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let value = runner
            .run_step("fetch:Supplier A", move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                    Ok(n)
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(value, 2);
        let history = history(&journal).await;
        assert_eq!(history.events[0].outcome, StepOutcome::TimedOut);
        assert_eq!(history.events[1].outcome, StepOutcome::Completed);
    }

    #[test]
    fn test_backoff_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.step_timeout, Duration::from_secs(10));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(8), Duration::from_secs(10));
    }
}
