use std::path::{Path, PathBuf};

pub mod ingest;
pub mod inventory;
pub mod query;
pub mod status;

pub const DB_FILE_NAME: &str = "sds_records.sqlite";

pub fn resolve_db_path(cache_root: &Path, db_path: Option<&Path>) -> PathBuf {
    db_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cache_root.join(DB_FILE_NAME))
}
