pub mod comparator;
pub mod compare_flow;
pub mod comparison;
pub mod direct;

pub use crate::domain::model::{CompareRequest, Hotel, PriceRange, ProviderListings, SupplierHotel};
pub use crate::domain::ports::{ConfigProvider, HotelCache, StepRunner, SupplierGateway};
pub use crate::utils::error::Result;
