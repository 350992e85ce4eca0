use crate::config::{default_suppliers, CacheConfig, SupplierSettings, WorkflowConfig};
use crate::core::ConfigProvider;
use crate::utils::error::{CompareError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_redis_url,
    validate_unique, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service: ServiceInfo,
    /// Falls back to the two local mock suppliers when absent.
    #[serde(default)]
    pub suppliers: Vec<SupplierEntry>,
    pub cache: Option<CacheSection>,
    pub workflow: Option<WorkflowSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierEntry {
    pub id: String,
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub probe_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    pub redis_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub operation_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSection {
    pub enabled: Option<bool>,
    pub task_queue: Option<String>,
    pub max_attempts: Option<u32>,
    pub step_timeout_seconds: Option<u64>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub journal_capacity: Option<usize>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ${VAR} 或 ${VAR:-default}
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("static regex is valid")
    })
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CompareError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CompareError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數；未設定且無預設值時保留原字串
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match (std::env::var(var_name), caps.get(2)) {
                    (Ok(value), _) => value,
                    (Err(_), Some(default)) => default.as_str().to_string(),
                    (Err(_), None) => caps[0].to_string(),
                }
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("service.name", &self.service.name)?;

        for supplier in &self.suppliers {
            validate_non_empty_string("suppliers.id", &supplier.id)?;
            validate_url("suppliers.endpoint", &supplier.endpoint)?;
            if let Some(timeout) = supplier.timeout_seconds {
                validate_positive_number("suppliers.timeout_seconds", timeout, 1)?;
            }
        }
        validate_unique("suppliers.id", self.suppliers.iter().map(|s| s.id.as_str()))?;

        if let Some(timeout) = self.cache.as_ref().and_then(|c| c.operation_timeout_ms) {
            validate_positive_number("cache.operation_timeout_ms", timeout, 1)?;
        }

        if let Some(redis_url) = self
            .cache
            .as_ref()
            .and_then(|c| c.redis_url.as_deref())
            .filter(|url| !url.is_empty())
        {
            validate_redis_url("cache.redis_url", redis_url)?;
        }

        if let Some(workflow) = &self.workflow {
            if let Some(attempts) = workflow.max_attempts {
                validate_range("workflow.max_attempts", attempts, 1, 10)?;
            }
            if let Some(timeout) = workflow.step_timeout_seconds {
                validate_positive_number("workflow.step_timeout_seconds", timeout, 1)?;
            }
            if let Some(capacity) = workflow.queue_capacity {
                validate_positive_number("workflow.queue_capacity", capacity as u64, 1)?;
            }
            if let Some(capacity) = workflow.journal_capacity {
                validate_positive_number("workflow.journal_capacity", capacity as u64, 1)?;
            }
        }

        Ok(())
    }

    pub fn service_name(&self) -> &str {
        &self.service.name
    }
}

impl ConfigProvider for TomlConfig {
    fn suppliers(&self) -> Vec<SupplierSettings> {
        if self.suppliers.is_empty() {
            return default_suppliers();
        }

        self.suppliers
            .iter()
            .map(|entry| {
                let mut settings = SupplierSettings::new(entry.id.clone(), entry.endpoint.clone());
                if let Some(secs) = entry.timeout_seconds {
                    settings.timeout = Duration::from_secs(secs);
                }
                if let Some(secs) = entry.probe_timeout_seconds {
                    settings.probe_timeout = Duration::from_secs(secs);
                }
                settings
            })
            .collect()
    }

    fn cache_config(&self) -> CacheConfig {
        let defaults = CacheConfig::default();
        match &self.cache {
            Some(section) => CacheConfig {
                redis_url: section.redis_url.clone().filter(|url| !url.trim().is_empty()),
                connect_timeout: section
                    .connect_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.connect_timeout),
                operation_timeout: section
                    .operation_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.operation_timeout),
            },
            None => defaults,
        }
    }

    fn workflow_config(&self) -> WorkflowConfig {
        let defaults = WorkflowConfig::default();
        let Some(section) = &self.workflow else {
            return defaults;
        };

        WorkflowConfig {
            enabled: section.enabled.unwrap_or(defaults.enabled),
            task_queue: section.task_queue.clone().unwrap_or(defaults.task_queue),
            max_attempts: section.max_attempts.unwrap_or(defaults.max_attempts),
            step_timeout: section
                .step_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.step_timeout),
            initial_backoff: section
                .initial_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: section
                .max_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            queue_capacity: section.queue_capacity.unwrap_or(defaults.queue_capacity),
            journal_capacity: section
                .journal_capacity
                .unwrap_or(defaults.journal_capacity),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
