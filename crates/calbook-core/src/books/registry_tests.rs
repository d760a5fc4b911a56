use super::*;
use crate::accounts::{LocalAccounts, StoreAccounts};
use crate::book::{BookRecord, Color, LOCAL_ACCOUNT_ID, STORE_TYPE_EVENT, STORE_TYPE_TODO};
use crate::error::CoreError;
use crate::storage::BookDb;

fn registry() -> Books<BookDb> {
    Books::new(BookDb::open_memory().unwrap(), Box::new(LocalAccounts))
}

fn named(name: &str) -> Book {
    let mut book = Book::new();
    book.set_name(name);
    book.set_uid(format!("uid-{name}"));
    book.set_color_rgb(Color::rgb(10, 20, 30));
    book
}

fn seed(db: &BookDb, name: &str, account_id: AccountId) -> BookId {
    db.insert_book(&BookRecord {
        name: name.to_string(),
        uid: format!("uid-{name}"),
        color: "10.20.30.255".to_string(),
        account_id,
        ..BookRecord::default()
    })
    .unwrap()
}

fn names(books: &Books<BookDb>, account_id: AccountId) -> Vec<String> {
    books
        .get_books_by_account_id(account_id)
        .unwrap_or_default()
        .into_iter()
        .map(|b| b.name().to_string())
        .collect()
}

#[test]
fn initialize_empty_store() {
    let mut books = registry();
    let report = books.initialize().unwrap();
    assert!(!report.has_changes());
    assert_eq!(books.accounts().count(), 0);
    assert!(books.is_empty());
}

#[test]
fn initialize_loads_store_books_in_order() {
    let mut books = registry();
    seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    seed(books.store(), "Home", LOCAL_ACCOUNT_ID);

    let report = books.initialize().unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(names(&books, LOCAL_ACCOUNT_ID), vec!["Work", "Home"]);
    assert!(books.is_consistent());
}

#[test]
fn insert_is_staged_until_commit() {
    let mut books = registry();
    books.initialize().unwrap();
    books.ensure_account(LOCAL_ACCOUNT_ID);

    let input = named("Work");
    let key = books.insert_book(LOCAL_ACCOUNT_ID, &input).unwrap();

    let staged = books.get_book(key).unwrap();
    assert_eq!(staged.dirty(), BookDirty::Insert);
    assert!(!staged.has_id());
    assert_eq!(staged.account_id(), LOCAL_ACCOUNT_ID);
    assert_eq!(books.account(LOCAL_ACCOUNT_ID).unwrap().dirty(), AccountDirty::Update);
    assert!(books.exist_name(LOCAL_ACCOUNT_ID, STORE_TYPE_EVENT, "Work"));
    assert_eq!(books.store().count().unwrap(), 0);

    assert_eq!(books.commit_to_db().unwrap(), 1);

    let id = books.get_book(key).unwrap().id();
    assert!(id > 0);
    assert!(books.get_book_by_id(id).unwrap().content_eq(&input));
    assert_eq!(books.store().get_book(id).unwrap().unwrap().name, "Work");
    assert!(books.is_consistent());
}

#[test]
fn insert_ignores_callers_id() {
    let mut books = registry();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    let mut input = named("Work");
    input.set_id(77);

    let key = books.insert_book(LOCAL_ACCOUNT_ID, &input).unwrap();

    assert!(books.get_book_by_id(77).is_none());
    assert!(!books.get_book(key).unwrap().has_id());
}

#[test]
fn insert_into_unknown_account_fails() {
    let mut books = registry();
    let err = books.insert_book(7, &named("Work")).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Registry(RegistryError::UnknownAccount(7))
    ));
}

#[test]
fn delete_twice_is_idempotent() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    books.delete_book(id).unwrap();
    books.delete_book(id).unwrap();

    let staged = books.get_book_by_id(id).unwrap();
    assert_eq!(staged.dirty(), BookDirty::Delete);

    assert_eq!(books.commit_to_db().unwrap(), 1);
    assert!(books.get_book_by_id(id).is_none());
    assert!(books.store().get_book(id).unwrap().is_none());
    assert!(names(&books, LOCAL_ACCOUNT_ID).is_empty());
    assert!(books.is_consistent());
}

#[test]
fn delete_unknown_book_fails() {
    let mut books = registry();
    assert!(matches!(
        books.delete_book(5),
        Err(CoreError::Registry(RegistryError::UnknownBook(5)))
    ));
}

#[test]
fn deleting_uncommitted_insert_never_reaches_store() {
    let mut books = registry();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    let key = books.insert_book(LOCAL_ACCOUNT_ID, &named("Draft")).unwrap();

    books.delete_book_by_key(key).unwrap();

    assert_eq!(books.commit_to_db().unwrap(), 0);
    assert!(books.get_book(key).is_none());
    assert_eq!(books.store().count().unwrap(), 0);
    assert!(books.is_consistent());
}

#[test]
fn update_book_skips_identical_content() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    let mut copy = books.get_book_by_id(id).unwrap().clone();
    copy.set_sync_data(1, "metadata only");
    assert!(!books.update_book(&copy).unwrap());
    assert!(!books.get_book_by_id(id).unwrap().dirty().is_pending());

    copy.set_name("Office");
    assert!(books.update_book(&copy).unwrap());
    assert_eq!(books.get_book_by_id(id).unwrap().dirty(), BookDirty::Update);

    assert_eq!(books.commit_to_db().unwrap(), 1);
    assert_eq!(books.store().get_book(id).unwrap().unwrap().name, "Office");
}

#[test]
fn update_of_staged_insert_stays_insert() {
    let mut books = registry();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    let key = books.insert_book(LOCAL_ACCOUNT_ID, &named("Draft")).unwrap();

    books.edit_book(key, |b| b.set_name("Final")).unwrap();

    assert_eq!(books.get_book(key).unwrap().dirty(), BookDirty::Insert);
    books.commit_to_db().unwrap();
    let id = books.get_book(key).unwrap().id();
    assert_eq!(books.store().get_book(id).unwrap().unwrap().name, "Final");
}

#[test]
fn update_unknown_book_fails() {
    let mut books = registry();
    let mut ghost = named("Ghost");
    ghost.set_id(999);
    assert!(matches!(
        books.update_book(&ghost),
        Err(CoreError::Registry(RegistryError::UnknownBook(999)))
    ));
}

#[test]
fn edit_book_marks_update_unconditionally() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    let key = books.key_of(id).unwrap();

    books.edit_book(key, |_| {}).unwrap();

    assert_eq!(books.get_book(key).unwrap().dirty(), BookDirty::Update);
    assert_eq!(books.account(LOCAL_ACCOUNT_ID).unwrap().dirty(), AccountDirty::Update);
}

#[test]
fn edit_book_keeps_id_and_account() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    let key = books.key_of(id).unwrap();

    books
        .edit_book(key, |b| {
            b.set_account_id(12);
            b.set_name("Moved");
        })
        .unwrap();

    let book = books.get_book(key).unwrap();
    assert_eq!(book.id(), id);
    assert_eq!(book.account_id(), LOCAL_ACCOUNT_ID);
    assert_eq!(book.name(), "Moved");
    assert!(books.is_consistent());
}

#[test]
fn commit_clears_every_dirty_tag() {
    let mut books = registry();
    let keep = seed(books.store(), "Keep", LOCAL_ACCOUNT_ID);
    let drop = seed(books.store(), "Drop", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    books.ensure_account(LOCAL_ACCOUNT_ID);
    books.insert_book(LOCAL_ACCOUNT_ID, &named("New")).unwrap();
    books.edit_book(books.key_of(keep).unwrap(), |b| b.set_visible(false)).unwrap();
    books.delete_book(drop).unwrap();

    assert_eq!(books.status().pending_count, 3);
    assert_eq!(books.commit_to_db().unwrap(), 3);

    assert!(books.iter().all(|(_, b)| b.dirty() == BookDirty::None));
    assert!(books.accounts().all(|a| a.dirty() == AccountDirty::None));
    assert_eq!(names(&books, LOCAL_ACCOUNT_ID), vec!["Keep", "New"]);
    assert!(!books.store().get_book(keep).unwrap().unwrap().visible);
}

#[test]
fn reconcile_converges_without_touching_identities() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    let key = books.key_of(id).unwrap();

    let first = books.update_from_db().unwrap();
    let second = books.update_from_db().unwrap();

    assert!(!first.has_changes());
    assert!(!second.has_changes());
    assert_eq!(books.key_of(id), Some(key));
}

#[test]
fn reconcile_removes_books_deleted_out_of_band() {
    let mut books = registry();
    let gone = seed(books.store(), "Gone", LOCAL_ACCOUNT_ID);
    let kept = seed(books.store(), "Kept", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    books.store().delete_book(gone).unwrap();
    let report = books.update_from_db().unwrap();

    assert_eq!(report.deleted, 1);
    assert!(report.has_changes());
    assert!(books.get_book_by_id(gone).is_none());
    assert!(books.get_book_by_id(kept).is_some());
    assert_eq!(names(&books, LOCAL_ACCOUNT_ID), vec!["Kept"]);
    assert!(books.is_consistent());
}

#[test]
fn reconcile_picks_up_remote_content_changes() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    let key = books.key_of(id).unwrap();

    let mut stored = books.store().get_book(id).unwrap().unwrap();
    stored.description = "changed elsewhere".to_string();
    books.store().update_book(&stored).unwrap();

    let report = books.update_from_db().unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(books.key_of(id), Some(key));
    assert_eq!(books.get_book(key).unwrap().description(), "changed elsewhere");
}

#[test]
fn reconcile_ignores_metadata_only_changes() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    let mut stored = books.store().get_book(id).unwrap().unwrap();
    stored.sync_data2 = "remote etag".to_string();
    books.store().update_book(&stored).unwrap();

    let report = books.update_from_db().unwrap();

    assert!(!report.has_changes());
    assert_eq!(books.get_book_by_id(id).unwrap().sync_data(2), "");
}

#[test]
fn reconcile_drops_accounts_left_empty() {
    let mut books = registry();
    let id = seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    assert!(books.account(LOCAL_ACCOUNT_ID).is_some());

    books.store().delete_book(id).unwrap();
    books.update_from_db().unwrap();

    assert!(books.account(LOCAL_ACCOUNT_ID).is_none());
    assert!(books.get_books_by_account_id(LOCAL_ACCOUNT_ID).is_none());
}

#[test]
fn reload_flushes_pending_edits_first() {
    let mut books = registry();
    books.initialize().unwrap();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    let key = books.insert_book(LOCAL_ACCOUNT_ID, &named("Unsaved")).unwrap();

    let report = books.update_from_db().unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(books.store().count().unwrap(), 1);
    assert_eq!(names(&books, LOCAL_ACCOUNT_ID), vec!["Unsaved"]);
    assert!(books.get_book(key).unwrap().has_id());
}

#[test]
fn colorless_books_get_a_fallback_color() {
    let mut books = registry();
    let id = books
        .store()
        .insert_book(&BookRecord {
            name: "Plain".to_string(),
            account_id: LOCAL_ACCOUNT_ID,
            ..BookRecord::default()
        })
        .unwrap();

    let report = books.initialize().unwrap();

    let expected = fallback_color(id).to_string();
    assert_eq!(report.colored, 1);
    assert_eq!(books.get_book_by_id(id).unwrap().color(), expected);
    assert_eq!(books.store().get_book(id).unwrap().unwrap().color, expected);
    assert_eq!(books.get_book_by_id(id).unwrap().dirty(), BookDirty::None);
    assert!(!books.update_from_db().unwrap().has_changes());
}

#[test]
fn color_assignment_can_be_disabled() {
    let mut books = registry().with_color_assignment(false);
    let id = books
        .store()
        .insert_book(&BookRecord {
            name: "Plain".to_string(),
            account_id: LOCAL_ACCOUNT_ID,
            ..BookRecord::default()
        })
        .unwrap();

    let report = books.initialize().unwrap();

    assert_eq!(report.colored, 0);
    assert!(!books.get_book_by_id(id).unwrap().has_color());
}

#[test]
fn exist_name_matches_name_and_store_type() {
    let mut books = registry();
    seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    assert!(books.exist_name(LOCAL_ACCOUNT_ID, STORE_TYPE_EVENT, "Work"));
    assert!(!books.exist_name(LOCAL_ACCOUNT_ID, STORE_TYPE_TODO, "Work"));
    assert!(!books.exist_name(LOCAL_ACCOUNT_ID, STORE_TYPE_EVENT, "work"));
    assert!(!books.exist_name(LOCAL_ACCOUNT_ID, STORE_TYPE_EVENT, ""));
    assert!(!books.exist_name(3, STORE_TYPE_EVENT, "Work"));
}

#[test]
fn local_directory_ignores_platform_accounts() {
    let mut books = registry();
    seed(books.store(), "Local", LOCAL_ACCOUNT_ID);
    seed(books.store(), "Remote", 5);

    books.initialize().unwrap();

    assert!(books.account(5).is_none());
    assert_eq!(books.len(), 1);
}

#[test]
fn store_directory_reconciles_every_account() {
    let db = BookDb::open_memory().unwrap();
    seed(&db, "Local", LOCAL_ACCOUNT_ID);
    let remote = seed(&db, "Remote", 5);
    let mut books = Books::new(db, Box::new(StoreAccounts));

    books.initialize().unwrap();

    let order: Vec<AccountId> = books.accounts().map(Account::id).collect();
    assert_eq!(order, vec![LOCAL_ACCOUNT_ID, 5]);
    assert_eq!(books.get_book_by_id(remote).unwrap().account_id(), 5);

    books.store().delete_book(remote).unwrap();
    let report = books.update_from_db().unwrap();
    assert_eq!(report.deleted, 1);
    assert!(books.account(5).is_none());
    assert!(books.get_book_by_id(remote).is_none());
    assert!(books.is_consistent());
}

#[test]
fn store_move_refiles_book_under_new_account() {
    let db = BookDb::open_memory().unwrap();
    let same = seed(&db, "Same", 5);
    let edited = seed(&db, "Edited", 5);
    let mut books = Books::new(db, Box::new(StoreAccounts));
    books.initialize().unwrap();

    for id in [same, edited] {
        let mut record = books.store().get_book(id).unwrap().unwrap();
        record.account_id = 7;
        if id == edited {
            record.description = "moved".to_string();
        }
        books.store().update_book(&record).unwrap();
    }
    let report = books.update_from_db().unwrap();

    assert!(report.has_changes());
    assert!(books.account(5).is_none());
    assert_eq!(names(&books, 7), vec!["Same", "Edited"]);
    assert_eq!(books.get_book_by_id(same).unwrap().account_id(), 7);
    assert_eq!(books.get_book_by_id(edited).unwrap().description(), "moved");
    assert!(books.is_consistent());
}

/// Store whose reads can be switched off to fail after a write succeeded.
struct FlakyReads {
    inner: BookDb,
    fail_reads: std::cell::Cell<bool>,
}

impl BookStore for FlakyReads {
    fn insert_book(&self, record: &BookRecord) -> Result<BookId> {
        self.inner.insert_book(record)
    }

    fn get_book(&self, id: BookId) -> Result<Option<BookRecord>> {
        if self.fail_reads.get() {
            return Err(DatabaseError::Locked.into());
        }
        self.inner.get_book(id)
    }

    fn update_book(&self, record: &BookRecord) -> Result<()> {
        self.inner.update_book(record)
    }

    fn delete_book(&self, id: BookId) -> Result<()> {
        self.inner.delete_book(id)
    }

    fn books_by_account(&self, account_id: AccountId) -> Result<Vec<BookRecord>> {
        self.inner.books_by_account(account_id)
    }

    fn account_ids(&self) -> Result<Vec<AccountId>> {
        self.inner.account_ids()
    }
}

#[test]
fn retried_commit_after_failed_read_back_does_not_duplicate() {
    let store = FlakyReads {
        inner: BookDb::open_memory().unwrap(),
        fail_reads: std::cell::Cell::new(false),
    };
    let mut books = Books::new(store, Box::new(LocalAccounts));
    books.initialize().unwrap();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    let key = books.insert_book(LOCAL_ACCOUNT_ID, &named("Work")).unwrap();

    books.store().fail_reads.set(true);
    assert!(books.commit_to_db().is_err());

    let id = books.get_book(key).unwrap().id();
    assert!(id > 0);
    assert_eq!(books.key_of(id), Some(key));
    assert_eq!(books.get_book(key).unwrap().dirty(), BookDirty::None);

    books.store().fail_reads.set(false);
    assert_eq!(books.commit_to_db().unwrap(), 0);
    assert_eq!(books.store().inner.count().unwrap(), 1);
    assert!(books.is_consistent());
}

#[test]
fn finalize_hands_back_the_store() {
    let mut books = registry();
    seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();
    books.ensure_account(LOCAL_ACCOUNT_ID);
    books.insert_book(LOCAL_ACCOUNT_ID, &named("Discarded")).unwrap();

    let db = books.finalize();

    assert_eq!(db.count().unwrap(), 1);
}

#[test]
fn status_tracks_last_sync() {
    let mut books = registry();
    assert!(books.status().last_sync_at.is_none());
    seed(books.store(), "Work", LOCAL_ACCOUNT_ID);
    books.initialize().unwrap();

    let status = books.status();
    assert!(status.last_sync_at.is_some());
    assert_eq!(status.book_count, 1);
    assert_eq!(status.account_count, 1);
    assert_eq!(status.pending_count, 0);
}
