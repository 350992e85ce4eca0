use crate::config::{
    CacheConfig, SupplierSettings, WorkflowConfig, DEFAULT_SUPPLIER_A_URL, DEFAULT_SUPPLIER_B_URL,
};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_positive_number, validate_range, validate_redis_url, validate_url, Validate,
};
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "hotel-compare")]
#[command(about = "Compare hotel prices across suppliers")]
pub struct CliConfig {
    #[arg(long, help = "City to search, e.g. delhi")]
    pub city: Option<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    #[arg(long, default_value = DEFAULT_SUPPLIER_A_URL)]
    pub supplier_a_url: String,

    #[arg(long, default_value = DEFAULT_SUPPLIER_B_URL)]
    pub supplier_b_url: String,

    #[arg(long, default_value = "5")]
    pub supplier_timeout_seconds: u64,

    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[arg(long, help = "Skip the workflow engine and compare directly")]
    pub no_workflow: bool,

    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    #[arg(long, default_value = "10")]
    pub step_timeout_seconds: u64,

    #[arg(long, help = "Print a health report instead of comparing")]
    pub health: bool,

    #[arg(long, help = "Pretty-print JSON output")]
    pub pretty: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn suppliers(&self) -> Vec<SupplierSettings> {
        let timeout = Duration::from_secs(self.supplier_timeout_seconds);
        vec![
            SupplierSettings::new("Supplier A", self.supplier_a_url.clone()).with_timeout(timeout),
            SupplierSettings::new("Supplier B", self.supplier_b_url.clone()).with_timeout(timeout),
        ]
    }

    fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url.clone(),
            ..CacheConfig::default()
        }
    }

    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            enabled: !self.no_workflow,
            max_attempts: self.max_attempts,
            step_timeout: Duration::from_secs(self.step_timeout_seconds),
            ..WorkflowConfig::default()
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("supplier_a_url", &self.supplier_a_url)?;
        validate_url("supplier_b_url", &self.supplier_b_url)?;
        validate_positive_number("supplier_timeout_seconds", self.supplier_timeout_seconds, 1)?;
        validate_positive_number("step_timeout_seconds", self.step_timeout_seconds, 1)?;
        validate_range("max_attempts", self.max_attempts, 1, 10)?;
        if let Some(redis_url) = &self.redis_url {
            validate_redis_url("redis_url", redis_url)?;
        }
        Ok(())
    }
}
