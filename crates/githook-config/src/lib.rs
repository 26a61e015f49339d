//! Configuration for the githook binaries.
//!
//! Settings come from three places, highest precedence first: environment
//! variables ([`EnvOverrides`]), the per-user YAML file
//! `~/.githook_config` ([`HookConfig`]) and built-in defaults.

pub mod env;
pub mod error;
pub mod file;
pub mod logging;

pub use env::EnvOverrides;
pub use error::ConfigError;
pub use file::{config_path, HookConfig, LimitSource, LogConfig, SizeLimit, CONFIG_FILE_NAME, DEFAULT_SIZE_LIMIT};
pub use logging::{init_logging, LogOutput, LogSettings};

pub type Result<T> = std::result::Result<T, ConfigError>;
