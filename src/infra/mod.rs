pub mod config_loader;

pub use config_loader::{ConfigError, ConfigHandle, ConfigSource};
