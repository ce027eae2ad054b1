pub mod assemble;
pub mod config_cmd;
pub mod memory;

use ctxforge_config::AppConfig;
use ctxforge_pipeline::ContextService;

/// Load config and build the service every command shares.
pub fn load_service() -> Result<ContextService, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(ContextService::builder(config).build()?)
}
