mod config;
pub mod book_db;
pub mod migrations;

pub use book_db::BookDb;
pub use config::{Config, LogConfig, StoreConfig, SyncConfig};

use std::path::PathBuf;

use crate::book::{AccountId, BookId, BookRecord};
use crate::error::{ConfigError, Result};

/// Returns `~/.config/calbook[-dev]/` based on CALBOOK_ENV.
///
/// Set CALBOOK_ENV=dev to use development data directory, or
/// CALBOOK_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("CALBOOK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("CALBOOK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("calbook-dev")
            } else {
                base_dir.join("calbook")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Transactional calendar-record store.
///
/// Writes are synchronous: when a call returns `Ok` the change is durable.
/// Callers treat any `Err` from a write as fatal for the operation in
/// progress.
pub trait BookStore {
    /// Persist a new book and return its store-assigned id.
    fn insert_book(&self, record: &BookRecord) -> Result<BookId>;

    fn get_book(&self, id: BookId) -> Result<Option<BookRecord>>;

    /// Overwrite every field of the stored book with `record.id`.
    fn update_book(&self, record: &BookRecord) -> Result<()>;

    fn delete_book(&self, id: BookId) -> Result<()>;

    /// All books owned by `account_id`, ordered by id.
    fn books_by_account(&self, account_id: AccountId) -> Result<Vec<BookRecord>>;

    /// Distinct account ids that currently own at least one book.
    fn account_ids(&self) -> Result<Vec<AccountId>>;
}
