use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::{load_config, PathsConfig};
use crate::registry::Registry;
use crate::report;

/// Print the registry. The path comes from `--registry`, else the config
/// file if it loads, else the default location.
pub fn show_status(config_path: &Path, registry_override: Option<PathBuf>) -> Result<()> {
    let registry_path = match registry_override {
        Some(path) => path,
        None => match load_config(config_path) {
            Ok(config) => config.paths.registry,
            Err(e) => {
                tracing::debug!(error = %e, "Using default registry location");
                PathsConfig::default().registry
            }
        },
    };

    let registry = Registry::open(&registry_path)?;
    if registry.is_empty() {
        println!("Registry {} has no entries", registry_path.display());
        return Ok(());
    }
    println!("{}", report::status_table(registry.entries()));
    Ok(())
}
