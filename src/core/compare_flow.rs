use crate::core::comparison::{filter_by_price, merge_listings};
use crate::domain::model::{CompareRequest, Hotel, ProviderListings};
use crate::domain::ports::{HotelCache, StepRunner, SupplierGateway};
use crate::utils::error::{CompareError, Result};
use futures::future::join_all;
use futures::FutureExt;
use std::sync::Arc;

pub const STEP_GET_CACHED: &str = "get_cached_hotels";
pub const STEP_SAVE: &str = "save_hotels";

/// 比價流程所需的外部協作者，供應商順序即合併順序
pub struct CompareActivities {
    pub suppliers: Vec<Arc<dyn SupplierGateway>>,
    pub cache: Arc<dyn HotelCache>,
}

impl CompareActivities {
    pub fn new(suppliers: Vec<Arc<dyn SupplierGateway>>, cache: Arc<dyn HotelCache>) -> Self {
        Self { suppliers, cache }
    }
}

pub fn fetch_step_name(provider_id: &str) -> String {
    format!("fetch:{}", provider_id)
}

/// The comparison algorithm shared by the workflow engine and the direct
/// executor. Only the [`StepRunner`] differs between the two paths.
///
/// 1. Bounded request: serve a non-empty cached snapshot if there is one.
/// 2. Fetch every supplier concurrently; a failed step counts as no listings.
/// 3. Merge in supplier order.
/// 4. Save the unfiltered merge.
/// 5. Return the filtered view.
pub async fn run_compare_flow<R: StepRunner>(
    runner: &R,
    activities: &CompareActivities,
    request: &CompareRequest,
) -> Result<Vec<Hotel>> {
    let key = request.cache_key();
    let range = request.range;

    if range.is_bounded() {
        let cache = Arc::clone(&activities.cache);
        let lookup_key = key.clone();
        let lookup = runner
            .run_step(STEP_GET_CACHED, move || {
                let cache = Arc::clone(&cache);
                let key = lookup_key.clone();
                async move { cache.get_hotels(&key, &range).await }.boxed()
            })
            .await;

        match lookup {
            Ok(cached) if !cached.is_empty() => {
                tracing::info!("💾 Serving {} cached hotels for {}", cached.len(), key);
                return Ok(cached);
            }
            Ok(_) => tracing::debug!("💾 No cached hotels for {}", key),
            Err(e) => tracing::warn!("⚠️ Cache lookup failed for {}: {}", key, e),
        }
    }

    let fetches = activities.suppliers.iter().map(|supplier| {
        let step = fetch_step_name(supplier.provider_id());
        let supplier = Arc::clone(supplier);
        let city = request.city.clone();
        async move {
            runner
                .run_step(&step, move || {
                    let supplier = Arc::clone(&supplier);
                    let city = city.clone();
                    async move { Ok::<_, CompareError>(supplier.fetch(&city).await) }.boxed()
                })
                .await
        }
    });
    let results = join_all(fetches).await;

    let listings: Vec<ProviderListings> = activities
        .suppliers
        .iter()
        .zip(results)
        .map(|(supplier, result)| {
            let hotels = result.unwrap_or_else(|e| {
                tracing::warn!(
                    "⚠️ Fetch from {} failed, continuing without it: {}",
                    supplier.provider_id(),
                    e
                );
                Vec::new()
            });
            ProviderListings::new(supplier.provider_id(), hotels)
        })
        .collect();

    let merged = merge_listings(&listings);

    let cache = Arc::clone(&activities.cache);
    let save_key = key.clone();
    let snapshot = Arc::new(merged.clone());
    let saved = runner
        .run_step(STEP_SAVE, move || {
            let cache = Arc::clone(&cache);
            let key = save_key.clone();
            let hotels = Arc::clone(&snapshot);
            async move { cache.save_hotels(&key, &hotels).await }.boxed()
        })
        .await;
    if let Err(e) = saved {
        tracing::error!("❌ Failed to cache hotels for {}: {}", key, e);
    }

    Ok(filter_by_price(&merged, &range))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::direct::DirectStepRunner;
    use std::sync::atomic::Ordering;

    fn activities(
        a: Arc<CountingGateway>,
        b: Arc<CountingGateway>,
        cache: Arc<RecordingCache>,
    ) -> CompareActivities {
        CompareActivities::new(vec![a as Arc<dyn SupplierGateway>, b], cache)
    }

    #[tokio::test]
    async fn test_cheaper_supplier_b_wins() {
        let a = Arc::new(CountingGateway::new("Supplier A", vec![listing("a1", "X", 8500.0)]));
        let b = Arc::new(CountingGateway::new("Supplier B", vec![listing("b1", "X", 8200.0)]));
        let cache = Arc::new(RecordingCache::default());

        let hotels = run_compare_flow(
            &DirectStepRunner,
            &activities(a, b, cache),
            &CompareRequest::new("delhi", None, None),
        )
        .await
        .unwrap();

        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].price, 8200.0);
        assert_eq!(hotels[0].supplier, "Supplier B");
    }

    #[tokio::test]
    async fn test_unbounded_request_skips_cache_lookup() {
        let a = Arc::new(CountingGateway::new("Supplier A", vec![listing("a1", "Y", 7800.0)]));
        let b = Arc::new(CountingGateway::new("Supplier B", vec![]));
        let cache = Arc::new(RecordingCache::default());
        cache.insert("hotels:delhi", vec![]).await;

        let acts = activities(a.clone(), b.clone(), cache.clone());
        let hotels = run_compare_flow(&DirectStepRunner, &acts, &CompareRequest::new("Delhi", None, None))
            .await
            .unwrap();

        assert_eq!(cache.gets.load(Ordering::SeqCst), 0);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(hotels[0].supplier, "Supplier A");
    }

    #[tokio::test]
    async fn test_bounded_request_served_from_cache() {
        let a = Arc::new(CountingGateway::new("Supplier A", vec![listing("a1", "X", 1.0)]));
        let b = Arc::new(CountingGateway::new("Supplier B", vec![listing("b1", "X", 1.0)]));
        let cache = Arc::new(RecordingCache::default());
        cache
            .insert(
                "hotels:delhi",
                vec![
                    Hotel {
                        name: "Taj Palace".to_string(),
                        price: 8200.0,
                        supplier: "Supplier B".to_string(),
                        commission_pct: 18.0,
                    },
                    Hotel {
                        name: "Radison".to_string(),
                        price: 5900.0,
                        supplier: "Supplier A".to_string(),
                        commission_pct: 13.0,
                    },
                ],
            )
            .await;

        let acts = activities(a.clone(), b.clone(), cache.clone());
        let hotels = run_compare_flow(
            &DirectStepRunner,
            &acts,
            &CompareRequest::new("delhi", Some(8000.0), None),
        )
        .await
        .unwrap();

        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 0);
        assert_eq!(cache.saves.load(Ordering::SeqCst), 0);
        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].name, "Taj Palace");
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_and_stores_unfiltered() {
        let a = Arc::new(CountingGateway::new(
            "Supplier A",
            vec![listing("a1", "Taj Palace", 8500.0), listing("a2", "Radison", 5900.0)],
        ));
        let b = Arc::new(CountingGateway::new(
            "Supplier B",
            vec![listing("b1", "Taj Palace", 8200.0), listing("b4", "Leela Palace", 9800.0)],
        ));
        let cache = Arc::new(RecordingCache::default());

        let acts = activities(a.clone(), b.clone(), cache.clone());
        let hotels = run_compare_flow(
            &DirectStepRunner,
            &acts,
            &CompareRequest::new("delhi", None, Some(9000.0)),
        )
        .await
        .unwrap();

        assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);

        let names: Vec<&str> = hotels.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Taj Palace", "Radison"]);

        let stored = cache.entry("hotels:delhi").await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].name, "Leela Palace");
    }

    #[tokio::test]
    async fn test_cache_faults_do_not_fail_the_flow() {
        let a = Arc::new(CountingGateway::new("Supplier A", vec![listing("a1", "Y", 7800.0)]));
        let b = Arc::new(CountingGateway::new("Supplier B", vec![]));
        let cache = Arc::new(RecordingCache::default());
        cache.get_failures_left.store(1, Ordering::SeqCst);
        cache.save_failures_left.store(1, Ordering::SeqCst);

        let acts = activities(a, b, cache.clone());
        let hotels = run_compare_flow(
            &DirectStepRunner,
            &acts,
            &CompareRequest::new("delhi", Some(1000.0), None),
        )
        .await
        .unwrap();

        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].supplier, "Supplier A");
        assert!(cache.entry("hotels:delhi").await.is_none());
    }

    #[tokio::test]
    async fn test_suppliers_are_fetched_concurrently() {
        let delay = std::time::Duration::from_millis(200);
        let a = Arc::new(
            CountingGateway::new("Supplier A", vec![listing("a1", "X", 1.0)]).with_delay(delay),
        );
        let b = Arc::new(
            CountingGateway::new("Supplier B", vec![listing("b1", "Z", 2.0)]).with_delay(delay),
        );
        let acts = activities(a, b, Arc::new(RecordingCache::default()));

        let started = std::time::Instant::now();
        let hotels = run_compare_flow(&DirectStepRunner, &acts, &CompareRequest::new("delhi", None, None))
            .await
            .unwrap();

        assert_eq!(hotels.len(), 2);
        assert!(started.elapsed() < std::time::Duration::from_millis(390));
    }

    #[tokio::test]
    async fn test_flow_runs_on_a_spawned_task() {
        let a = Arc::new(CountingGateway::new("Supplier A", vec![listing("a1", "Y", 7800.0)]));
        let b = Arc::new(CountingGateway::new("Supplier B", vec![]));
        let acts = activities(a, b, Arc::new(RecordingCache::default()));
        let request = CompareRequest::new("delhi", Some(1000.0), None);

        let hotels = tokio::spawn(async move {
            run_compare_flow(&DirectStepRunner, &acts, &request).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(hotels.len(), 1);
    }
}
