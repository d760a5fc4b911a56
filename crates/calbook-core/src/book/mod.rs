//! Calendar books.
//!
//! A [`Book`] is a named container for schedules ("Work", "Personal").
//! It owns exactly one [`BookRecord`], the plain value exchanged with the
//! record store, and carries a [`BookDirty`] tag describing how the
//! in-memory copy differs from what is persisted.

pub mod color;

use serde::{Deserialize, Serialize};

pub use color::{fallback_color, Color, FALLBACK_PALETTE};

/// Store-assigned book identifier.
pub type BookId = i32;
/// Identifier of the account that owns a book.
pub type AccountId = i32;

/// Id carried by a book the store has not seen yet.
pub const UNSET_BOOK_ID: BookId = -1;
/// Account id of a book that was never bound to an account.
pub const UNSET_ACCOUNT_ID: AccountId = 0;
/// The on-device account every installation has.
pub const LOCAL_ACCOUNT_ID: AccountId = -1;

/// Book holds events.
pub const STORE_TYPE_EVENT: i32 = 1;
/// Book holds todos.
pub const STORE_TYPE_TODO: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookMode {
    #[default]
    Default,
    ReadOnly,
}

impl BookMode {
    pub fn as_i32(self) -> i32 {
        match self {
            BookMode::Default => 0,
            BookMode::ReadOnly => 1,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => BookMode::ReadOnly,
            _ => BookMode::Default,
        }
    }
}

/// Why (or whether) an in-memory book differs from the store.
///
/// | from            | event                 | to      |
/// |-----------------|-----------------------|---------|
/// | (new)           | inserted by caller    | Insert  |
/// | (new)           | found by reconcile    | Checked |
/// | None / Checked  | updated               | Update  |
/// | Insert          | updated               | Insert  |
/// | Delete          | updated               | Delete  |
/// | any             | deleted               | Delete  |
/// | None            | seen by reconcile     | Checked |
/// | any             | committed             | None    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookDirty {
    #[default]
    None,
    Insert,
    Delete,
    Update,
    Checked,
}

impl BookDirty {
    pub(crate) fn after_update(self) -> Self {
        match self {
            BookDirty::Insert | BookDirty::Delete => self,
            BookDirty::None | BookDirty::Update | BookDirty::Checked => BookDirty::Update,
        }
    }

    /// Whether the next commit has work to do for this book.
    pub fn is_pending(self) -> bool {
        matches!(self, BookDirty::Insert | BookDirty::Delete | BookDirty::Update)
    }
}

/// One calendar-book record as the store sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub uid: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub location: String,
    pub visible: bool,
    pub account_id: AccountId,
    pub store_type: i32,
    pub sync_data1: String,
    pub sync_data2: String,
    pub sync_data3: String,
    pub sync_data4: String,
    pub mode: BookMode,
}

impl Default for BookRecord {
    fn default() -> Self {
        Self {
            id: UNSET_BOOK_ID,
            uid: String::new(),
            name: String::new(),
            description: String::new(),
            color: String::new(),
            location: String::new(),
            visible: true,
            account_id: UNSET_ACCOUNT_ID,
            store_type: STORE_TYPE_EVENT,
            sync_data1: String::new(),
            sync_data2: String::new(),
            sync_data3: String::new(),
            sync_data4: String::new(),
            mode: BookMode::Default,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    record: BookRecord,
    dirty: BookDirty,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: BookRecord) -> Self {
        Self {
            record,
            dirty: BookDirty::None,
        }
    }

    pub fn record(&self) -> &BookRecord {
        &self.record
    }

    pub fn into_record(self) -> BookRecord {
        self.record
    }

    /// Replace the owned record, dropping the previous one.
    pub fn set_record(&mut self, record: BookRecord) {
        self.record = record;
    }

    pub fn dirty(&self) -> BookDirty {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: BookDirty) {
        self.dirty = dirty;
    }

    pub fn id(&self) -> BookId {
        self.record.id
    }

    pub(crate) fn set_id(&mut self, id: BookId) {
        self.record.id = id;
    }

    pub fn has_id(&self) -> bool {
        self.record.id > 0
    }

    pub fn uid(&self) -> &str {
        &self.record.uid
    }

    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.record.uid = uid.into();
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.record.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.record.description = description.into();
    }

    /// Raw stored color string.
    pub fn color(&self) -> &str {
        &self.record.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.record.color = color.into();
    }

    pub fn has_color(&self) -> bool {
        !self.record.color.trim().is_empty()
    }

    pub fn color_rgb(&self) -> Color {
        Color::parse(&self.record.color)
    }

    pub fn set_color_rgb(&mut self, color: Color) {
        self.record.color = color.to_string();
    }

    pub fn location(&self) -> &str {
        &self.record.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.record.location = location.into();
    }

    pub fn visible(&self) -> bool {
        self.record.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.record.visible = visible;
    }

    pub fn account_id(&self) -> AccountId {
        self.record.account_id
    }

    /// Bind the book to an account. Once bound to a real account the
    /// binding is permanent and further calls are ignored.
    pub fn set_account_id(&mut self, account_id: AccountId) {
        if self.record.account_id > 0 {
            tracing::error!(
                book = self.record.id,
                current = self.record.account_id,
                requested = account_id,
                "refusing to rebind book to another account"
            );
            return;
        }
        self.record.account_id = account_id;
    }

    pub(crate) fn force_account_id(&mut self, account_id: AccountId) {
        self.record.account_id = account_id;
    }

    pub fn store_type(&self) -> i32 {
        self.record.store_type
    }

    pub fn set_store_type(&mut self, store_type: i32) {
        self.record.store_type = store_type;
    }

    pub fn mode(&self) -> BookMode {
        self.record.mode
    }

    pub fn set_mode(&mut self, mode: BookMode) {
        self.record.mode = mode;
    }

    /// Opaque sync slot 1-4. Any other index reads as empty.
    pub fn sync_data(&self, slot: usize) -> &str {
        match slot {
            1 => &self.record.sync_data1,
            2 => &self.record.sync_data2,
            3 => &self.record.sync_data3,
            4 => &self.record.sync_data4,
            _ => "",
        }
    }

    /// Returns false when `slot` is outside 1-4.
    pub fn set_sync_data(&mut self, slot: usize, value: impl Into<String>) -> bool {
        let target = match slot {
            1 => &mut self.record.sync_data1,
            2 => &mut self.record.sync_data2,
            3 => &mut self.record.sync_data3,
            4 => &mut self.record.sync_data4,
            _ => return false,
        };
        *target = value.into();
        true
    }

    /// Display-relevant equality. Account, store type, mode and sync
    /// data are metadata and do not take part.
    pub fn content_eq(&self, other: &Book) -> bool {
        let (a, b) = (&self.record, &other.record);
        a.visible == b.visible
            && a.name == b.name
            && a.color == b.color
            && a.uid == b.uid
            && a.description == b.description
            && a.location == b.location
    }
}
