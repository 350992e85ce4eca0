use crate::domain::model::{Hotel, PriceRange, Priced, ProviderListings};
use std::collections::HashMap;

/// 合併所有供應商的報價，每個飯店名稱只保留最低價。
///
/// Providers are processed in slice order. A later listing replaces the
/// stored one only when strictly cheaper, so on an exact tie the entry that
/// was inserted first keeps its attribution. Output follows first-seen order.
pub fn merge_listings(providers: &[ProviderListings]) -> Vec<Hotel> {
    let mut merged: Vec<Hotel> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for provider in providers {
        for listing in &provider.hotels {
            let candidate = Hotel {
                name: listing.name.clone(),
                price: listing.price,
                supplier: provider.provider_id.clone(),
                commission_pct: listing.commission_pct,
            };

            match index_by_name.get(listing.name.as_str()) {
                Some(&index) => {
                    if candidate.price < merged[index].price {
                        merged[index] = candidate;
                    }
                }
                None => {
                    index_by_name.insert(listing.name.as_str(), merged.len());
                    merged.push(candidate);
                }
            }
        }
    }

    tracing::debug!(
        "🔀 Merged {} listings from {} providers into {} hotels",
        providers.iter().map(|p| p.hotels.len()).sum::<usize>(),
        providers.len(),
        merged.len()
    );

    merged
}

/// Keeps the items whose price lies inside `range` (inclusive), preserving order.
pub fn filter_by_price<T: Priced + Clone>(items: &[T], range: &PriceRange) -> Vec<T> {
    if !range.is_bounded() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| range.contains(item.price()))
        .cloned()
        .collect()
}
