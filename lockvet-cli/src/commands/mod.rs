//! Command handlers -- one module per subcommand

pub mod config;
pub mod fetch;
pub mod history;
pub mod scan;
pub mod show;

use std::path::Path;
use std::sync::Arc;

use lockvet_advisory::AdvisoryCache;
use lockvet_core::config::LockvetConfig;
use lockvet_core::error::{ConfigError, LockvetError};
use lockvet_scanner::ScanService;

use crate::error::CliError;

/// Load configuration, falling back to defaults when no file exists.
///
/// A missing `lockvet.toml` is not an error for day-to-day commands;
/// `config validate` checks the file explicitly instead.
pub(crate) async fn load_config(config_path: &Path) -> Result<LockvetConfig, CliError> {
    match LockvetConfig::load(config_path).await {
        Ok(config) => Ok(config),
        Err(LockvetError::Config(ConfigError::FileNotFound { .. })) => {
            Ok(LockvetConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the scan service backed by the configured advisory cache.
pub(crate) async fn build_service(config_path: &Path) -> Result<ScanService, CliError> {
    let config = load_config(config_path).await?;
    let cache = AdvisoryCache::open(&config.cache)
        .await
        .map_err(LockvetError::from)?;
    Ok(ScanService::new(Arc::new(cache), config.scan))
}
