pub mod cli;
pub mod engine;

pub use cli::Cli;
pub use engine::{AppConfig, BulkConfig, EngineConfig, ProviderConfig};
