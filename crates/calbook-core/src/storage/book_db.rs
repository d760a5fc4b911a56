//! SQLite-backed calendar book store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations, BookStore};
use crate::book::{AccountId, BookId, BookMode, BookRecord};
use crate::error::{DatabaseError, Result};

const BOOK_COLUMNS: &str = "id, uid, name, description, color, location, visible, account_id, \
     store_type, sync_data1, sync_data2, sync_data3, sync_data4, mode";

fn row_to_record(row: &rusqlite::Row) -> Result<BookRecord, rusqlite::Error> {
    Ok(BookRecord {
        id: row.get(0)?,
        uid: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        location: row.get(5)?,
        visible: row.get::<_, i32>(6)? != 0,
        account_id: row.get(7)?,
        store_type: row.get(8)?,
        sync_data1: row.get(9)?,
        sync_data2: row.get(10)?,
        sync_data3: row.get(11)?,
        sync_data4: row.get(12)?,
        mode: BookMode::from_i32(row.get(13)?),
    })
}

/// SQLite database holding calendar book records.
pub struct BookDb {
    conn: Connection,
}

impl BookDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/calbook.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("calbook.db");
        Self::open_at(&path)
    }

    /// Open (creating if needed) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Number of stored books, across all accounts.
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(DatabaseError::from)?;
        let count = usize::try_from(n)
            .map_err(|_| DatabaseError::QueryFailed(format!("negative book count {n}")))?;
        Ok(count)
    }
}

impl BookStore for BookDb {
    fn insert_book(&self, record: &BookRecord) -> Result<BookId> {
        self.conn
            .execute(
                "INSERT INTO books (uid, name, description, color, location, visible,
                                    account_id, store_type, sync_data1, sync_data2,
                                    sync_data3, sync_data4, mode)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.uid,
                    record.name,
                    record.description,
                    record.color,
                    record.location,
                    record.visible,
                    record.account_id,
                    record.store_type,
                    record.sync_data1,
                    record.sync_data2,
                    record.sync_data3,
                    record.sync_data4,
                    record.mode.as_i32(),
                ],
            )
            .map_err(DatabaseError::from)?;
        let rowid = self.conn.last_insert_rowid();
        let id = BookId::try_from(rowid)
            .map_err(|_| DatabaseError::QueryFailed(format!("book id {rowid} out of range")))?;
        Ok(id)
    }

    fn get_book(&self, id: BookId) -> Result<Option<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1");
        let record = self
            .conn
            .query_row(&sql, params![id], row_to_record)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(record)
    }

    fn update_book(&self, record: &BookRecord) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE books SET uid = ?1, name = ?2, description = ?3, color = ?4,
                                  location = ?5, visible = ?6, account_id = ?7,
                                  store_type = ?8, sync_data1 = ?9, sync_data2 = ?10,
                                  sync_data3 = ?11, sync_data4 = ?12, mode = ?13
                 WHERE id = ?14",
                params![
                    record.uid,
                    record.name,
                    record.description,
                    record.color,
                    record.location,
                    record.visible,
                    record.account_id,
                    record.store_type,
                    record.sync_data1,
                    record.sync_data2,
                    record.sync_data3,
                    record.sync_data4,
                    record.mode.as_i32(),
                    record.id,
                ],
            )
            .map_err(DatabaseError::from)?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(record.id).into());
        }
        Ok(())
    }

    fn delete_book(&self, id: BookId) -> Result<()> {
        self.conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    fn books_by_account(&self, account_id: AccountId) -> Result<Vec<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE account_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).map_err(DatabaseError::from)?;
        let records = stmt
            .query_map(params![account_id], row_to_record)
            .map_err(DatabaseError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(records)
    }

    fn account_ids(&self) -> Result<Vec<AccountId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT account_id FROM books ORDER BY account_id")
            .map_err(DatabaseError::from)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, AccountId>(0))
            .map_err(DatabaseError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(ids)
    }
}
