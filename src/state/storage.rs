// File system locations for app data
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
}

pub type StorageResult<T> = Result<T, StorageError>;

const APP_DIR_NAME: &str = "com.brightpath.app";
const DB_FILE_NAME: &str = "brightpath.db";
const CONFIG_FILE_NAME: &str = "config.json";

/// Get the app data directory for BrightPath
pub fn get_app_data_dir() -> StorageResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
    let app_dir = data_dir.join(APP_DIR_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Path of the progress database
pub fn get_db_path() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join(DB_FILE_NAME))
}

/// Path of the user configuration file (may not exist yet)
pub fn get_config_path() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE_NAME))
}
