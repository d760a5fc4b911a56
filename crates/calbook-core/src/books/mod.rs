//! In-memory registry of calendar books.
//!
//! [`Books`] mirrors the book records of a [`BookStore`] grouped by
//! owning account. Edits only touch memory and tag the affected book and
//! account dirty; [`Books::commit_to_db`] writes them back in one pass.
//! [`Books::update_from_db`] flushes pending edits, then re-reads every
//! account and sweeps away books the store no longer reports.
//!
//! Storage is an arena keyed by [`BookKey`]. Accounts hold the ordered
//! keys they own and `by_id` indexes stored books by store id. A book
//! staged for deletion stays reachable by id until the commit removes it,
//! so callers of [`Books::get_book_by_id`] must look at its dirty tag.

pub mod account;
pub mod types;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

pub use account::{Account, AccountDirty, BookKey};
pub use types::{SyncReport, SyncStatus};

use crate::accounts::AccountDirectory;
use crate::book::{fallback_color, AccountId, Book, BookDirty, BookId, UNSET_BOOK_ID};
use crate::error::{DatabaseError, RegistryError, Result};
use crate::storage::BookStore;

pub struct Books<S> {
    store: S,
    directory: Box<dyn AccountDirectory>,
    accounts: IndexMap<AccountId, Account>,
    arena: HashMap<BookKey, Book>,
    by_id: HashMap<BookId, BookKey>,
    next_key: u64,
    assign_colors: bool,
    last_sync_at: Option<DateTime<Utc>>,
}

impl<S: BookStore> Books<S> {
    pub fn new(store: S, directory: Box<dyn AccountDirectory>) -> Self {
        Self {
            store,
            directory,
            accounts: IndexMap::new(),
            arena: HashMap::new(),
            by_id: HashMap::new(),
            next_key: 0,
            assign_colors: true,
            last_sync_at: None,
        }
    }

    /// Toggle fallback color assignment after each sync.
    pub fn with_color_assignment(mut self, enabled: bool) -> Self {
        self.assign_colors = enabled;
        self
    }

    /// First load from the store.
    pub fn initialize(&mut self) -> Result<SyncReport> {
        tracing::debug!("loading books");
        self.update_from_db()
    }

    /// Drop every cached account and book, handing the store back.
    ///
    /// Uncommitted edits are discarded.
    pub fn finalize(mut self) -> S {
        let pending = self.pending_count();
        if pending > 0 {
            tracing::warn!(pending, "discarding uncommitted book edits");
        }
        self.accounts.clear();
        self.arena.clear();
        self.by_id.clear();
        self.store
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // === Lookups ===

    pub fn get_book(&self, key: BookKey) -> Option<&Book> {
        self.arena.get(&key)
    }

    /// May return a book staged for deletion; check [`Book::dirty`].
    pub fn get_book_by_id(&self, id: BookId) -> Option<&Book> {
        self.by_id.get(&id).and_then(|key| self.arena.get(key))
    }

    pub fn key_of(&self, id: BookId) -> Option<BookKey> {
        self.by_id.get(&id).copied()
    }

    pub fn account(&self, account_id: AccountId) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Books of one account in display order, or `None` for an unknown account.
    pub fn get_books_by_account_id(&self, account_id: AccountId) -> Option<Vec<&Book>> {
        let Some(account) = self.accounts.get(&account_id) else {
            tracing::warn!(account = account_id, "no such account");
            return None;
        };
        Some(
            account
                .books
                .iter()
                .filter_map(|key| self.arena.get(key))
                .collect(),
        )
    }

    /// Every cached book, account by account.
    pub fn iter(&self) -> impl Iterator<Item = (BookKey, &Book)> {
        self.accounts.values().flat_map(move |account| {
            account
                .books
                .iter()
                .filter_map(move |key| self.arena.get(key).map(|book| (*key, book)))
        })
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Whether `account_id` already has a book of `store_type` called `name`.
    pub fn exist_name(&self, account_id: AccountId, store_type: i32, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let Some(account) = self.accounts.get(&account_id) else {
            return false;
        };
        account
            .books
            .iter()
            .filter_map(|key| self.arena.get(key))
            .any(|book| book.store_type() == store_type && book.name() == name)
    }

    pub fn pending_count(&self) -> usize {
        self.arena.values().filter(|b| b.dirty().is_pending()).count()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            last_sync_at: self.last_sync_at,
            pending_count: self.pending_count(),
            account_count: self.accounts.len(),
            book_count: self.arena.len(),
        }
    }

    /// Check the arena/account/index invariants.
    ///
    /// Every account entry refers to a live book filed under that account,
    /// every live book is listed by exactly one account, and every stored
    /// book is indexed by its id.
    pub fn is_consistent(&self) -> bool {
        let mut listed = 0;
        for (account_id, account) in &self.accounts {
            for key in &account.books {
                match self.arena.get(key) {
                    Some(book) if book.account_id() == *account_id => listed += 1,
                    _ => return false,
                }
            }
        }
        if listed != self.arena.len() {
            return false;
        }
        let indexed = self
            .arena
            .iter()
            .filter(|(_, book)| book.has_id())
            .all(|(key, book)| self.by_id.get(&book.id()) == Some(key));
        indexed && self.by_id.values().all(|key| self.arena.contains_key(key))
    }

    // === Mutations (memory only) ===

    /// Register an empty account so books can be inserted into it.
    pub fn ensure_account(&mut self, account_id: AccountId) {
        self.accounts
            .entry(account_id)
            .or_insert_with(|| Account::new(account_id));
    }

    /// Stage a copy of `book` for insertion into `account_id`.
    ///
    /// The copy has no store id until the next commit; use the returned
    /// key to reach it before then.
    pub fn insert_book(&mut self, account_id: AccountId, book: &Book) -> Result<BookKey> {
        if !self.accounts.contains_key(&account_id) {
            tracing::warn!(account = account_id, "insert into unknown account");
            return Err(RegistryError::UnknownAccount(account_id).into());
        }

        let mut copy = book.clone();
        copy.set_id(UNSET_BOOK_ID);
        copy.force_account_id(account_id);
        copy.set_dirty(BookDirty::Insert);
        let key = self.alloc(copy);

        if let Some(account) = self.accounts.get_mut(&account_id) {
            account.books.push(key);
            account.dirty = AccountDirty::Update;
        }
        tracing::debug!(account = account_id, name = book.name(), "staged book insert");
        Ok(key)
    }

    /// Apply `book`'s content to the cached book with the same id.
    ///
    /// Returns `Ok(false)` when nothing display-relevant changed, in which
    /// case nothing is staged.
    pub fn update_book(&mut self, book: &Book) -> Result<bool> {
        let Some(key) = self.key_of(book.id()) else {
            tracing::warn!(id = book.id(), "update of unknown book");
            return Err(RegistryError::UnknownBook(book.id()).into());
        };
        let canonical = self
            .arena
            .get_mut(&key)
            .ok_or(RegistryError::UnknownBook(book.id()))?;
        if canonical.content_eq(book) {
            return Ok(false);
        }

        let account_id = canonical.account_id();
        canonical.set_record(book.record().clone());
        canonical.force_account_id(account_id);
        canonical.set_dirty(canonical.dirty().after_update());
        self.mark_account(account_id);
        tracing::debug!(id = book.id(), "staged book update");
        Ok(true)
    }

    /// Mutate the cached book in place; it is staged unconditionally.
    ///
    /// The id and owning account are restored after `f` runs.
    pub fn edit_book<F>(&mut self, key: BookKey, f: F) -> Result<()>
    where
        F: FnOnce(&mut Book),
    {
        let book = self.arena.get_mut(&key).ok_or(RegistryError::UnknownKey)?;
        let (id, account_id) = (book.id(), book.account_id());
        f(book);
        book.set_id(id);
        book.force_account_id(account_id);
        book.set_dirty(book.dirty().after_update());
        self.mark_account(account_id);
        Ok(())
    }

    /// Stage deletion of a stored book. Deleting twice is harmless.
    pub fn delete_book(&mut self, id: BookId) -> Result<()> {
        let Some(key) = self.key_of(id) else {
            tracing::warn!(id, "delete of unknown book");
            return Err(RegistryError::UnknownBook(id).into());
        };
        self.delete_book_by_key(key)
    }

    /// Stage deletion by handle; also reaches books never committed.
    pub fn delete_book_by_key(&mut self, key: BookKey) -> Result<()> {
        let book = self.arena.get_mut(&key).ok_or(RegistryError::UnknownKey)?;
        book.set_dirty(BookDirty::Delete);
        let (id, account_id) = (book.id(), book.account_id());
        self.mark_account(account_id);
        tracing::debug!(id, "staged book delete");
        Ok(())
    }

    // === Store round trips ===

    /// Write every staged edit to the store and reset all dirty tags.
    ///
    /// Returns the number of store writes. A failed write aborts the pass;
    /// books already written stay committed and the rest stay staged.
    pub fn commit_to_db(&mut self) -> Result<usize> {
        let dirty_accounts: Vec<AccountId> = self
            .accounts
            .iter()
            .filter(|(_, account)| account.dirty == AccountDirty::Update)
            .map(|(id, _)| *id)
            .collect();

        let mut writes = 0;
        for account_id in dirty_accounts {
            let keys = match self.accounts.get(&account_id) {
                Some(account) => account.books.clone(),
                None => continue,
            };
            for key in keys {
                writes += self.commit_book(key)?;
            }
        }

        for book in self.arena.values_mut() {
            book.set_dirty(BookDirty::None);
        }
        for account in self.accounts.values_mut() {
            account.dirty = AccountDirty::None;
        }
        if writes > 0 {
            tracing::info!(writes, "committed books");
        }
        Ok(writes)
    }

    fn commit_book(&mut self, key: BookKey) -> Result<usize> {
        let Some(book) = self.arena.get(&key) else {
            return Ok(0);
        };
        match book.dirty() {
            BookDirty::Insert => {
                let id = self.store.insert_book(book.record())?;
                if let Some(book) = self.arena.get_mut(&key) {
                    book.set_id(id);
                    book.set_dirty(BookDirty::None);
                }
                self.by_id.insert(id, key);
                tracing::debug!(id, "inserted book");

                let stored = self
                    .store
                    .get_book(id)?
                    .ok_or(DatabaseError::NotFound(id))?;
                if let Some(book) = self.arena.get_mut(&key) {
                    book.set_record(stored);
                }
                Ok(1)
            }
            BookDirty::Delete => {
                let id = book.id();
                let stored = book.has_id();
                if stored {
                    self.store.delete_book(id)?;
                    tracing::debug!(id, "deleted book");
                }
                self.remove_book(key);
                Ok(usize::from(stored))
            }
            BookDirty::Update => {
                self.store.update_book(book.record())?;
                let id = book.id();
                if let Some(book) = self.arena.get_mut(&key) {
                    book.set_dirty(BookDirty::None);
                }
                tracing::debug!(id, "updated book");
                Ok(1)
            }
            BookDirty::None | BookDirty::Checked => Ok(0),
        }
    }

    /// Flush pending edits, then reload every directory account from the store.
    pub fn update_from_db(&mut self) -> Result<SyncReport> {
        self.commit_to_db()?;

        // Cached accounts are revisited even when the store no longer lists them.
        let mut account_ids = self.directory.account_ids(&self.store)?;
        for cached in self.accounts.keys() {
            if !account_ids.contains(cached) {
                account_ids.push(*cached);
            }
        }
        let mut report = SyncReport::default();
        for account_id in account_ids {
            self.reconcile_account(account_id, &mut report)?;
        }

        if self.assign_colors {
            report.colored = self.assign_missing_colors();
            if report.colored > 0 {
                self.commit_to_db()?;
            }
        }

        self.last_sync_at = Some(Utc::now());
        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            colored = report.colored,
            "books synced"
        );
        Ok(report)
    }

    fn reconcile_account(&mut self, account_id: AccountId, report: &mut SyncReport) -> Result<()> {
        let records = self.store.books_by_account(account_id)?;
        self.ensure_account(account_id);
        if let Some(account) = self.accounts.get_mut(&account_id) {
            account.dirty = AccountDirty::Checked;
        }

        for record in records {
            let incoming = Book::from_record(record);
            let cached_key = self
                .key_of(incoming.id())
                .filter(|key| self.arena.contains_key(key));
            match cached_key {
                Some(key) => {
                    let mut moved_from = None;
                    if let Some(cached) = self.arena.get_mut(&key) {
                        if cached.account_id() != account_id {
                            moved_from = Some(cached.account_id());
                        }
                        if moved_from.is_some() || !cached.content_eq(&incoming) {
                            cached.set_record(incoming.into_record());
                            report.updated += 1;
                        }
                        cached.set_dirty(BookDirty::Checked);
                    }
                    if let Some(from) = moved_from {
                        self.move_book(key, from, account_id);
                    }
                }
                None => {
                    let mut book = incoming;
                    book.set_dirty(BookDirty::Checked);
                    let key = self.alloc(book);
                    if let Some(account) = self.accounts.get_mut(&account_id) {
                        account.books.push(key);
                    }
                    report.inserted += 1;
                }
            }
        }

        let unchecked: Vec<BookKey> = self
            .accounts
            .get(&account_id)
            .map(|account| {
                account
                    .books
                    .iter()
                    .filter(|key| {
                        self.arena
                            .get(*key)
                            .map_or(true, |book| book.dirty() != BookDirty::Checked)
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        for key in unchecked {
            if let Some(book) = self.remove_book(key) {
                tracing::debug!(id = book.id(), "book removed from store");
            }
            report.deleted += 1;
        }

        if self.accounts.get(&account_id).is_some_and(Account::is_empty) {
            self.accounts.shift_remove(&account_id);
            tracing::debug!(account = account_id, "dropped empty account");
        }
        Ok(())
    }

    fn assign_missing_colors(&mut self) -> usize {
        let mut colored = Vec::new();
        for book in self.arena.values_mut() {
            if book.has_id() && !book.has_color() {
                book.set_color_rgb(fallback_color(book.id()));
                book.set_dirty(book.dirty().after_update());
                colored.push(book.account_id());
            }
        }
        for account_id in &colored {
            self.mark_account(*account_id);
        }
        colored.len()
    }

    // === Arena bookkeeping ===

    fn alloc(&mut self, book: Book) -> BookKey {
        let key = BookKey(self.next_key);
        self.next_key += 1;
        if book.has_id() {
            self.by_id.insert(book.id(), key);
        }
        self.arena.insert(key, book);
        key
    }

    fn remove_book(&mut self, key: BookKey) -> Option<Book> {
        let book = self.arena.remove(&key)?;
        if self.by_id.get(&book.id()) == Some(&key) {
            self.by_id.remove(&book.id());
        }
        match self.accounts.get_mut(&book.account_id()) {
            Some(account) => account.detach(key),
            None => {
                for account in self.accounts.values_mut() {
                    account.detach(key);
                }
            }
        }
        Some(book)
    }

    /// Refile `key` under `to`, dropping `from` if that empties it.
    fn move_book(&mut self, key: BookKey, from: AccountId, to: AccountId) {
        if let Some(account) = self.accounts.get_mut(&from) {
            account.detach(key);
            if account.is_empty() {
                self.accounts.shift_remove(&from);
            }
        }
        if let Some(account) = self.accounts.get_mut(&to) {
            account.books.push(key);
        }
        tracing::debug!(from, to, "book moved between accounts");
    }

    fn mark_account(&mut self, account_id: AccountId) {
        if let Some(account) = self.accounts.get_mut(&account_id) {
            account.dirty = AccountDirty::Update;
        }
    }
}

#[cfg(test)]
mod registry_tests;
