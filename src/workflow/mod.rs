//! In-process durable execution: compare requests are queued as workflow
//! tasks, a worker picks them up from the task queue and each step runs
//! under the retry policy with its attempts written to the journal.

pub mod history;
pub mod runner;

pub use history::{StepEvent, StepOutcome, WorkflowHistory, WorkflowJournal, WorkflowStatus};
pub use runner::{DurableStepRunner, RetryPolicy};

use crate::config::WorkflowConfig;
use crate::core::compare_flow::{run_compare_flow, CompareActivities};
use crate::domain::model::{CompareRequest, Hotel};
use crate::utils::error::{CompareError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct WorkflowTask {
    workflow_id: String,
    request: CompareRequest,
    reply: oneshot::Sender<Result<Vec<Hotel>>>,
}

/// Handle to a submitted workflow; resolves once the worker finishes it.
pub struct WorkflowHandle {
    workflow_id: String,
    receiver: oneshot::Receiver<Result<Vec<Hotel>>>,
}

impl WorkflowHandle {
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub async fn result(self) -> Result<Vec<Hotel>> {
        self.receiver
            .await
            .map_err(|_| CompareError::OrchestrationUnavailable {
                message: format!("workflow {} was dropped before completing", self.workflow_id),
            })?
    }
}

/// 工作流引擎：以任務佇列接收比價請求，由背景 worker 執行
pub struct WorkflowEngine {
    config: WorkflowConfig,
    sender: Mutex<Option<mpsc::Sender<WorkflowTask>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    journal: Arc<WorkflowJournal>,
    sequence: AtomicU64,
}

impl WorkflowEngine {
    /// Starts the worker loop on the configured task queue.
    pub fn start(activities: Arc<CompareActivities>, config: WorkflowConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let journal = Arc::new(WorkflowJournal::with_capacity(config.journal_capacity));
        let policy = RetryPolicy::from_config(&config);

        info!(
            "🚀 Workflow worker listening on task queue '{}'",
            config.task_queue
        );
        let worker = tokio::spawn(worker_loop(
            receiver,
            activities,
            Arc::clone(&journal),
            policy,
        ));

        Self {
            config,
            sender: Mutex::new(Some(sender)),
            worker: std::sync::Mutex::new(Some(worker)),
            journal,
            sequence: AtomicU64::new(0),
        }
    }

    /// An engine that rejects every submission, used when orchestration is disabled.
    pub fn unavailable(config: WorkflowConfig) -> Self {
        let journal = Arc::new(WorkflowJournal::with_capacity(config.journal_capacity));
        Self {
            config,
            sender: Mutex::new(None),
            worker: std::sync::Mutex::new(None),
            journal,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn task_queue(&self) -> &str {
        &self.config.task_queue
    }

    pub async fn is_running(&self) -> bool {
        self.sender
            .lock()
            .await
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    fn next_workflow_id(&self, city: &str) -> String {
        let slug = city
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "compare-hotels-{}-{}-{}",
            slug,
            chrono::Utc::now().timestamp_millis(),
            seq
        )
    }

    pub async fn start_workflow(&self, request: &CompareRequest) -> Result<WorkflowHandle> {
        let sender = self
            .sender
            .lock()
            .await
            .clone()
            .ok_or_else(|| CompareError::OrchestrationUnavailable {
                message: format!("no worker on task queue '{}'", self.config.task_queue),
            })?;

        let workflow_id = self.next_workflow_id(&request.city);
        let (reply, receiver) = oneshot::channel();
        let task = WorkflowTask {
            workflow_id: workflow_id.clone(),
            request: request.clone(),
            reply,
        };

        sender
            .send(task)
            .await
            .map_err(|_| CompareError::OrchestrationUnavailable {
                message: format!("task queue '{}' is closed", self.config.task_queue),
            })?;

        debug!("📨 Submitted workflow {}", workflow_id);
        Ok(WorkflowHandle {
            workflow_id,
            receiver,
        })
    }

    /// Submits a workflow and waits for its result.
    pub async fn execute(&self, request: &CompareRequest) -> Result<Vec<Hotel>> {
        self.start_workflow(request).await?.result().await
    }

    pub async fn history(&self, workflow_id: &str) -> Option<WorkflowHistory> {
        self.journal.get(workflow_id).await
    }

    /// Closes the task queue and waits for the worker loop to exit.
    /// Workflows already picked up keep running to completion.
    pub async fn stop(&self) {
        self.sender.lock().await.take();

        let worker = self
            .worker
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("❌ Workflow worker ended abnormally: {}", e);
            }
            info!("🛑 Workflow worker stopped");
        }
    }
}

async fn worker_loop(
    mut receiver: mpsc::Receiver<WorkflowTask>,
    activities: Arc<CompareActivities>,
    journal: Arc<WorkflowJournal>,
    policy: RetryPolicy,
) {
    while let Some(task) = receiver.recv().await {
        let activities = Arc::clone(&activities);
        let journal = Arc::clone(&journal);
        let policy = policy.clone();
        tokio::spawn(async move {
            run_workflow(task, &activities, journal, policy).await;
        });
    }
}

async fn run_workflow(
    task: WorkflowTask,
    activities: &CompareActivities,
    journal: Arc<WorkflowJournal>,
    policy: RetryPolicy,
) {
    let WorkflowTask {
        workflow_id,
        request,
        reply,
    } = task;

    journal.begin(&workflow_id).await;
    info!("▶️ Workflow {} started", workflow_id);

    let runner = DurableStepRunner::new(workflow_id.clone(), policy, Arc::clone(&journal));
    let result = run_compare_flow(&runner, activities, &request).await;

    let status = match &result {
        Ok(hotels) => {
            info!("✅ Workflow {} completed with {} hotels", workflow_id, hotels.len());
            WorkflowStatus::Completed
        }
        Err(e) => {
            warn!("⚠️ Workflow {} failed: {}", workflow_id, e);
            WorkflowStatus::Failed
        }
    };
    journal.finish(&workflow_id, status).await;

    if reply.send(result).is_err() {
        debug!("Caller of workflow {} went away before the result", workflow_id);
    }
}
