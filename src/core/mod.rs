pub mod bulk;
pub mod cache;
pub mod crops;
pub mod payout;
pub mod planting;
pub mod quote;
pub mod series;

pub use bulk::BulkOrchestrator;
pub use crops::CropRegistry;
pub use quote::QuoteEngine;
