pub mod config;
pub mod error;
pub mod loader;

pub use crate::config::{BASE_URL, Configuration};
pub use crate::error::{ConfigError, Result};
pub use crate::loader::{CONFIG_FILE, ConfigLoader, load_config, load_config_or_exit};
