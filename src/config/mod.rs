#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use std::time::Duration;

pub const DEFAULT_SUPPLIER_A_URL: &str = "http://localhost:3000/supplierA/hotels";
pub const DEFAULT_SUPPLIER_B_URL: &str = "http://localhost:3000/supplierB/hotels";
pub const DEFAULT_TASK_QUEUE: &str = "hotel-task-queue";

/// 單一供應商的連線設定
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierSettings {
    pub id: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub probe_timeout: Duration,
}

impl SupplierSettings {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub fn default_suppliers() -> Vec<SupplierSettings> {
    vec![
        SupplierSettings::new("Supplier A", DEFAULT_SUPPLIER_A_URL),
        SupplierSettings::new("Supplier B", DEFAULT_SUPPLIER_B_URL),
    ]
}

/// 快取設定；未設定 `redis_url` 時只使用記憶體快取
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub connect_timeout: Duration,
    /// Upper bound for a single GET or SET against Redis.
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            connect_timeout: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(1),
        }
    }
}

/// Durable workflow settings: task queue and per-step retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub enabled: bool,
    pub task_queue: String,
    pub max_attempts: u32,
    pub step_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub queue_capacity: usize,
    /// Finished workflow histories kept before the oldest are evicted.
    pub journal_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            max_attempts: 3,
            step_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            queue_capacity: 64,
            journal_capacity: 1024,
        }
    }
}
