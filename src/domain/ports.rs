use crate::config::{CacheConfig, SupplierSettings, WorkflowConfig};
use crate::domain::model::{Hotel, PriceRange, SupplierHotel};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// 單一上游供應商。任何上游錯誤都在內部轉為空結果，不回傳給呼叫端。
#[async_trait]
pub trait SupplierGateway: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn fetch(&self, city: &str) -> Vec<SupplierHotel>;

    /// Reachability check used by the health report.
    async fn probe(&self) -> bool;
}

/// Cache collaborator as seen by the comparison flow.
///
/// Errors returned here are retried by the step runner; the production
/// [`CacheStore`](crate::cache::CacheStore) absorbs its own faults and always
/// returns `Ok`.
#[async_trait]
pub trait HotelCache: Send + Sync {
    async fn get_hotels(&self, key: &str, range: &PriceRange) -> Result<Vec<Hotel>>;

    async fn save_hotels(&self, key: &str, hotels: &[Hotel]) -> Result<()>;

    fn status(&self) -> bool {
        true
    }
}

/// One attempt of a workflow step. Built from owned data so a runner can
/// call it again on retry and the surrounding flow can be spawned.
pub type StepFuture<T> = BoxFuture<'static, Result<T>>;

/// Executes one named step of the comparison flow.
///
/// The durable runner adds retries, a per-attempt deadline and a journal
/// entry per attempt; the direct runner simply awaits the operation once.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step<T, F>(&self, step: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> StepFuture<T> + Send + Sync + 'static;
}

pub trait ConfigProvider: Send + Sync {
    fn suppliers(&self) -> Vec<SupplierSettings>;
    fn cache_config(&self) -> CacheConfig;
    fn workflow_config(&self) -> WorkflowConfig;
}
