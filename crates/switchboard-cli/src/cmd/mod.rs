pub mod actions;
pub mod config;
pub mod init;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use switchboard_core::config::Config;
use switchboard_core::orchestrator::Orchestrator;
use switchboard_core::paths;
use switchboard_core::store::RedbRecordStore;

/// Load the config and open the record store under `root`.
pub(crate) fn open_orchestrator(root: &Path) -> anyhow::Result<(Config, Orchestrator)> {
    let config = Config::load(root).context("failed to load config")?;
    let db_path = paths::records_db_path(root);
    let store = RedbRecordStore::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let orchestrator = Orchestrator::from_config(&config, root, Arc::new(store))
        .context("failed to build action catalog")?;
    Ok((config, orchestrator))
}
