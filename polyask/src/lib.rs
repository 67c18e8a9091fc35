pub mod config;
pub mod executor;
pub mod normalize;
pub mod orchestrator;
pub mod presenter;
pub mod providers;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::{AppConfig, ConfigManager, EnvSnapshot};
pub use executor::Executor;
pub use normalize::{FieldPath, normalize};
pub use orchestrator::Orchestrator;
pub use presenter::render;
pub use providers::registry::{WireFormat, builtin_providers};
pub use providers::transport::ReqwestTransport;
pub use providers::{AuthStyle, LineupEntry, ProviderError, ProviderSpec, Transport};
pub use types::*;
