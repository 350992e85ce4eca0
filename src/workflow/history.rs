use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub step: String,
    pub attempt: u32,
    pub outcome: StepOutcome,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

/// 單一工作流的執行紀錄
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowHistory {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub events: Vec<StepEvent>,
}

impl WorkflowHistory {
    pub fn attempts_for(&self, step: &str) -> usize {
        self.events.iter().filter(|e| e.step == step).count()
    }

    pub fn completed(&self, step: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.step == step && e.outcome == StepOutcome::Completed)
    }
}

const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct JournalState {
    histories: HashMap<String, WorkflowHistory>,
    order: VecDeque<String>,
}

impl JournalState {
    /// Drops the oldest finished histories until the journal fits. Running
    /// workflows are never evicted.
    fn evict_finished(&mut self, capacity: usize) {
        while self.histories.len() > capacity {
            let finished = self.order.iter().position(|id| {
                self.histories
                    .get(id)
                    .map_or(true, |h| h.status != WorkflowStatus::Running)
            });
            let Some(index) = finished else {
                break;
            };
            if let Some(id) = self.order.remove(index) {
                self.histories.remove(&id);
            }
        }
    }
}

/// Step journal shared by every workflow of one engine, bounded to
/// `capacity` histories.
#[derive(Debug)]
pub struct WorkflowJournal {
    capacity: usize,
    state: Mutex<JournalState>,
}

impl Default for WorkflowJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl WorkflowJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(JournalState::default()),
        }
    }

    pub async fn begin(&self, workflow_id: &str) {
        let history = WorkflowHistory {
            workflow_id: workflow_id.to_string(),
            status: WorkflowStatus::Running,
            started_at: Utc::now(),
            events: Vec::new(),
        };

        let mut state = self.state.lock().await;
        if state
            .histories
            .insert(workflow_id.to_string(), history)
            .is_none()
        {
            state.order.push_back(workflow_id.to_string());
        }
        state.evict_finished(self.capacity);
    }

    pub async fn record(&self, workflow_id: &str, step: &str, attempt: u32, outcome: StepOutcome) {
        let mut state = self.state.lock().await;
        if let Some(history) = state.histories.get_mut(workflow_id) {
            history.events.push(StepEvent {
                step: step.to_string(),
                attempt,
                outcome,
                recorded_at: Utc::now(),
            });
        }
    }

    pub async fn finish(&self, workflow_id: &str, status: WorkflowStatus) {
        let mut state = self.state.lock().await;
        if let Some(history) = state.histories.get_mut(workflow_id) {
            history.status = status;
        }
        state.evict_finished(self.capacity);
    }

    pub async fn get(&self, workflow_id: &str) -> Option<WorkflowHistory> {
        self.state.lock().await.histories.get(workflow_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.histories.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
