use crate::utils::error::{CompareError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};

/// 單一供應商回傳的飯店報價
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierHotel {
    pub hotel_id: String,
    pub name: String,
    pub price: f64,
    pub city: String,
    pub commission_pct: f64,
}

/// 比價後每個飯店名稱的最佳報價
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub name: String,
    pub price: f64,
    pub supplier: String,
    pub commission_pct: f64,
}

/// 某一供應商的全部報價，合併時依序處理
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderListings {
    pub provider_id: String,
    pub hotels: Vec<SupplierHotel>,
}

impl ProviderListings {
    pub fn new(provider_id: impl Into<String>, hotels: Vec<SupplierHotel>) -> Self {
        Self {
            provider_id: provider_id.into(),
            hotels,
        }
    }
}

/// Anything that carries a price and can be filtered by a [`PriceRange`].
pub trait Priced {
    fn price(&self) -> f64;
}

impl Priced for Hotel {
    fn price(&self) -> f64 {
        self.price
    }
}

/// Inclusive price bounds. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, price: f64) -> bool {
        if let Some(min) = self.min {
            if price < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if price > max {
                return false;
            }
        }
        true
    }
}

/// 一次比價請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub city: String,
    pub range: PriceRange,
}

impl CompareRequest {
    pub fn new(city: impl Into<String>, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        Self {
            city: city.into(),
            range: PriceRange::new(min_price, max_price),
        }
    }

    /// 快取鍵，城市名稱正規化為小寫
    pub fn cache_key(&self) -> String {
        cache_key_for(&self.city)
    }
}

pub fn cache_key_for(city: &str) -> String {
    format!("hotels:{}", city.trim().to_lowercase())
}

impl Validate for CompareRequest {
    fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(CompareError::ValidationError {
                message: "City parameter is required".to_string(),
            });
        }

        for (field, bound) in [("minPrice", self.range.min), ("maxPrice", self.range.max)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(CompareError::ValidationError {
                        message: format!("{} must be a finite number", field),
                    });
                }
            }
        }

        Ok(())
    }
}
