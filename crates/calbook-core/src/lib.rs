//! # calbook core library
//!
//! Keeps an in-memory mirror of the calendar books held by a record
//! store, lets callers edit that mirror freely, and writes the edits back
//! in batches.
//!
//! ## Architecture
//!
//! - **Book**: value type owning one store record plus a dirty tag
//! - **Books**: registry of all books grouped by account; reconciles
//!   against the store (mark and sweep) and commits staged edits
//! - **Accounts**: decides which accounts a sync pass covers
//! - **Storage**: SQLite record store and TOML configuration
//!
//! ## Key Components
//!
//! - [`Books`]: the cache and its `update_from_db` / `commit_to_db` cycle
//! - [`Book`]: one calendar book
//! - [`BookDb`]: SQLite implementation of [`BookStore`]
//! - [`Config`]: application configuration

pub mod accounts;
pub mod book;
pub mod books;
pub mod error;
pub mod storage;

pub use accounts::{AccountDirectory, LocalAccounts, StoreAccounts};
pub use book::{Book, BookDirty, BookId, BookMode, BookRecord, Color, AccountId, LOCAL_ACCOUNT_ID};
pub use books::{Account, AccountDirty, BookKey, Books, SyncReport, SyncStatus};
pub use error::{ConfigError, CoreError, DatabaseError, RegistryError};
pub use storage::{BookDb, BookStore, Config};
