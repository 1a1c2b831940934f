pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{ChirpsClient, JsonFieldStore, StaticZoneLookup, TemplateNarrative};
pub use config::{AppConfig, Cli, EngineConfig};
pub use core::{BulkOrchestrator, CropRegistry, QuoteEngine};
pub use domain::model::{QuoteMode, QuoteOutcome, QuoteRequest, QuoteResult};
pub use utils::error::{QuoteError, Result};
