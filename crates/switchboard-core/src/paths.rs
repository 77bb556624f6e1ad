use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SWITCHBOARD_DIR: &str = ".switchboard";
pub const CONFIG_FILE: &str = ".switchboard/config.yaml";
pub const RECORDS_DB: &str = ".switchboard/records.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn switchboard_dir(root: &Path) -> PathBuf {
    root.join(SWITCHBOARD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn records_db_path(root: &Path) -> PathBuf {
    root.join(RECORDS_DB)
}
