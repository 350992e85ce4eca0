use crate::core::compare_flow::{run_compare_flow, CompareActivities};
use crate::domain::model::{CompareRequest, Hotel};
use crate::domain::ports::{StepFuture, StepRunner};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs every step exactly once, without retries or a journal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStepRunner;

#[async_trait]
impl StepRunner for DirectStepRunner {
    async fn run_step<T, F>(&self, step: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> StepFuture<T> + Send + Sync + 'static,
    {
        tracing::trace!("▶️ direct step {}", step);
        op().await
    }
}

/// 工作流引擎無法使用時的直接執行路徑，演算法與工作流相同
#[derive(Clone)]
pub struct DirectExecutor {
    activities: Arc<CompareActivities>,
}

impl DirectExecutor {
    pub fn new(activities: Arc<CompareActivities>) -> Self {
        Self { activities }
    }

    pub async fn execute(&self, request: &CompareRequest) -> Result<Vec<Hotel>> {
        tracing::info!("🔁 Running direct comparison for {}", request.city);
        run_compare_flow(&DirectStepRunner, &self.activities, request).await
    }
}
