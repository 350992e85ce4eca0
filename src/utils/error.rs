use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Supplier request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Cache backend error: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Orchestration unavailable: {message}")]
    OrchestrationUnavailable { message: String },

    #[error("Step '{step}' timed out after {timeout:?}")]
    StepTimeout { step: String, timeout: Duration },

    #[error("Step '{step}' failed after {attempts} attempt(s): {message}")]
    StepFailed {
        step: String,
        attempts: u32,
        message: String,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// 錯誤分類，對應系統的降級策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamUnavailable,
    CacheUnavailable,
    OrchestrationUnavailable,
    ValidationFault,
    InternalFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CompareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompareError::ApiError(_) => ErrorKind::UpstreamUnavailable,
            CompareError::CacheError(_) | CompareError::SerializationError(_) => {
                ErrorKind::CacheUnavailable
            }
            CompareError::OrchestrationUnavailable { .. }
            | CompareError::StepTimeout { .. }
            | CompareError::StepFailed { .. } => ErrorKind::OrchestrationUnavailable,
            CompareError::ConfigError { .. }
            | CompareError::MissingConfigError { .. }
            | CompareError::InvalidConfigValueError { .. }
            | CompareError::ValidationError { .. } => ErrorKind::ValidationFault,
            CompareError::IoError(_) | CompareError::InternalError { .. } => {
                ErrorKind::InternalFault
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::UpstreamUnavailable | ErrorKind::CacheUnavailable => ErrorSeverity::Low,
            ErrorKind::OrchestrationUnavailable => ErrorSeverity::Medium,
            ErrorKind::ValidationFault => ErrorSeverity::High,
            ErrorKind::InternalFault => ErrorSeverity::Critical,
        }
    }

    /// 呼叫端是否應視為用戶輸入錯誤 (400 類)
    pub fn is_client_fault(&self) -> bool {
        self.kind() == ErrorKind::ValidationFault
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CompareError::ValidationError { message } => format!("Invalid request: {}", message),
            CompareError::ConfigError { message } => format!("Invalid configuration: {}", message),
            CompareError::MissingConfigError { field } => {
                format!("Missing configuration value: {}", field)
            }
            CompareError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration value for {}: {}", field, reason)
            }
            CompareError::ApiError(_) => "A hotel supplier could not be reached".to_string(),
            CompareError::CacheError(_) | CompareError::SerializationError(_) => {
                "The hotel cache is unavailable".to_string()
            }
            CompareError::OrchestrationUnavailable { .. }
            | CompareError::StepTimeout { .. }
            | CompareError::StepFailed { .. } => {
                "The comparison workflow could not be completed".to_string()
            }
            CompareError::IoError(_) | CompareError::InternalError { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ValidationFault => "Check the command-line arguments or configuration file",
            ErrorKind::UpstreamUnavailable => "Verify the supplier endpoints are reachable",
            ErrorKind::CacheUnavailable => "Verify REDIS_URL; the in-memory cache is used meanwhile",
            ErrorKind::OrchestrationUnavailable => {
                "Retry later or run with --no-workflow to compare directly"
            }
            ErrorKind::InternalFault => "Run again with --verbose and inspect the logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
