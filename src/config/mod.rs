//! Configuration handling.

mod loader;

pub use loader::{Config, ConfigError, HostConfig, ProviderConfig, ReviewConfig};
