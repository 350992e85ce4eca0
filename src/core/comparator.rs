use crate::adapters::HttpSupplierGateway;
use crate::app::health::{HealthReport, ServiceStatus};
use crate::cache::CacheStore;
use crate::core::compare_flow::CompareActivities;
use crate::core::direct::DirectExecutor;
use crate::domain::model::{CompareRequest, Hotel};
use crate::domain::ports::{ConfigProvider, SupplierGateway};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use crate::workflow::WorkflowEngine;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 比價服務入口：優先交給工作流引擎，失敗時改走直接執行
pub struct HotelComparator {
    activities: Arc<CompareActivities>,
    workflows: WorkflowEngine,
    direct: DirectExecutor,
    cache_store: Option<CacheStore>,
}

impl HotelComparator {
    pub fn new(activities: Arc<CompareActivities>, workflows: WorkflowEngine) -> Self {
        Self {
            direct: DirectExecutor::new(Arc::clone(&activities)),
            activities,
            workflows,
            cache_store: None,
        }
    }

    /// Wires HTTP gateways, the cache store and the workflow worker from
    /// configuration. Must be called inside a Tokio runtime.
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let client = reqwest::Client::new();
        let suppliers: Vec<Arc<dyn SupplierGateway>> = config
            .suppliers()
            .into_iter()
            .map(|settings| {
                Arc::new(HttpSupplierGateway::with_client(settings, client.clone()))
                    as Arc<dyn SupplierGateway>
            })
            .collect();

        let cache_store = CacheStore::start(config.cache_config());
        let activities = Arc::new(CompareActivities::new(
            suppliers,
            Arc::new(cache_store.clone()),
        ));

        let workflow_config = config.workflow_config();
        let workflows = if workflow_config.enabled {
            WorkflowEngine::start(Arc::clone(&activities), workflow_config)
        } else {
            info!("⏭️ Workflow engine disabled, comparisons run directly");
            WorkflowEngine::unavailable(workflow_config)
        };

        let mut comparator = Self::new(activities, workflows);
        comparator.cache_store = Some(cache_store);
        comparator
    }

    pub fn cache_store(&self) -> Option<&CacheStore> {
        self.cache_store.as_ref()
    }

    pub fn workflows(&self) -> &WorkflowEngine {
        &self.workflows
    }

    /// Compare hotels across all suppliers.
    ///
    /// Only a validation fault reaches the caller. An orchestration failure
    /// falls back to the direct path, and if that fails too the result is an
    /// empty list.
    pub async fn compare(&self, request: &CompareRequest) -> Result<Vec<Hotel>> {
        request.validate()?;

        match self.workflows.execute(request).await {
            Ok(hotels) => return Ok(hotels),
            Err(e) => warn!(
                "⚠️ Workflow execution failed, falling back to direct execution: {}",
                e
            ),
        }

        let direct = self.direct.clone();
        let owned = request.clone();
        match tokio::spawn(async move { direct.execute(&owned).await }).await {
            Ok(Ok(hotels)) => Ok(hotels),
            Ok(Err(e)) => {
                error!("❌ Direct execution failed: {}", e);
                Ok(Vec::new())
            }
            Err(e) => {
                error!("❌ Direct execution task aborted: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Check every supplier concurrently and report the cache status.
    pub async fn health(&self) -> HealthReport {
        let checks = self.activities.suppliers.iter().map(|supplier| async move {
            let status = if supplier.probe().await {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Unhealthy
            };
            (supplier.provider_id().to_string(), status)
        });
        let suppliers = join_all(checks).await;

        let cache = ServiceStatus::from_bool(self.activities.cache.status());
        HealthReport::new(suppliers, cache)
    }

    /// Stop the workflow worker and release the cache.
    pub async fn shutdown(&self) {
        self.workflows.stop().await;
        if let Some(store) = &self.cache_store {
            store.stop().await;
        }
        info!("👋 Hotel comparator shut down");
    }
}
