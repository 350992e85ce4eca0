use serde::Serialize;
use std::collections::BTreeMap;

/// Key under which the cache status appears in the report.
pub const CACHE_SERVICE: &str = "cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

impl ServiceStatus {
    pub fn from_bool(up: bool) -> Self {
        if up {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

/// 健康檢查結果。整體狀態只看供應商，快取永遠可用（有記憶體後備）
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub services: BTreeMap<String, ServiceStatus>,
}

impl HealthReport {
    pub fn new(suppliers: Vec<(String, ServiceStatus)>, cache: ServiceStatus) -> Self {
        let status = if suppliers.iter().all(|(_, s)| s.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        let mut services: BTreeMap<String, ServiceStatus> = suppliers.into_iter().collect();
        services.insert(CACHE_SERVICE.to_string(), cache);

        Self { status, services }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
