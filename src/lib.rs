pub mod adapters;
pub mod app;
pub mod cache;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod workflow;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use cache::CacheStore;
pub use crate::core::comparator::HotelComparator;
pub use utils::error::{CompareError, Result};
