pub mod config_cmd;
pub mod memory;
pub mod research;
pub mod serve;

use std::path::Path;

use agora_config::AppConfig;

/// Load configuration from `path` or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}
