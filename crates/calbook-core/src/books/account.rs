use serde::{Deserialize, Serialize};

use crate::book::AccountId;

/// Registry-local handle of a cached book.
///
/// Unlike a store id, a key exists from the moment a book enters the
/// registry, including books still waiting for their first commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookKey(pub(crate) u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountDirty {
    #[default]
    None,
    /// Owns at least one book the next commit must write.
    Update,
    /// Seen by the current reconciliation pass.
    Checked,
}

/// A source of books: the local account or a synced platform account.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    pub(crate) dirty: AccountDirty,
    /// Display order.
    pub(crate) books: Vec<BookKey>,
}

impl Account {
    pub(crate) fn new(id: AccountId) -> Self {
        Self {
            id,
            dirty: AccountDirty::None,
            books: Vec::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn dirty(&self) -> AccountDirty {
        self.dirty
    }

    pub fn keys(&self) -> &[BookKey] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub(crate) fn detach(&mut self, key: BookKey) {
        self.books.retain(|k| *k != key);
    }
}
