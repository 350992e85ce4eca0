pub mod health;

pub use health::{HealthReport, HealthStatus, ServiceStatus};
