//! Account enumeration: which accounts a sync pass reconciles.

use crate::book::{AccountId, LOCAL_ACCOUNT_ID};
use crate::error::Result;
use crate::storage::BookStore;

/// Source of the account ids reconciled by [`Books::update_from_db`].
///
/// [`Books::update_from_db`]: crate::books::Books::update_from_db
pub trait AccountDirectory {
    fn account_ids(&self, store: &dyn BookStore) -> Result<Vec<AccountId>>;
}

/// Reconciles the on-device account only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAccounts;

impl AccountDirectory for LocalAccounts {
    fn account_ids(&self, _store: &dyn BookStore) -> Result<Vec<AccountId>> {
        Ok(vec![LOCAL_ACCOUNT_ID])
    }
}

/// Local account first, then every other account the store knows about.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreAccounts;

impl AccountDirectory for StoreAccounts {
    fn account_ids(&self, store: &dyn BookStore) -> Result<Vec<AccountId>> {
        let mut ids = vec![LOCAL_ACCOUNT_ID];
        for id in store.account_ids()? {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Directory matching the `sync.platform_accounts` setting.
pub fn directory_for(platform_accounts: bool) -> Box<dyn AccountDirectory> {
    if platform_accounts {
        Box::new(StoreAccounts)
    } else {
        Box::new(LocalAccounts)
    }
}
