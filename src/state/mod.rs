// State management module
// SQLite practice history and app data locations

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{init_db, open_db, open_in_memory, DbConnection, DbError, DbResult};
pub use models::{LetterProgress, PracticeAttempt};
pub use queries::{
    get_attempt, letter_progress, list_attempts_for_letter, list_letter_progress,
    record_attempt, reset_letter,
};
pub use storage::{get_app_data_dir, get_config_path, get_db_path, StorageError};
