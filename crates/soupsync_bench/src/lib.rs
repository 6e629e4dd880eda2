//! Benchmark utilities.

use serde_json::Value;
use soupsync_engine::{RelationshipType, SyncOptions};
use soupsync_testkit::{
    account_contacts_target, account_names, create_hierarchies_with_flags, ServerHierarchy,
    TestStore,
};

/// Generate a server batch of `accounts` accounts with `contacts` contacts each.
pub fn server_batch(accounts: usize, contacts: usize) -> Vec<Value> {
    ServerHierarchy::generate(accounts, contacts).to_batch()
}

/// Create a store holding `accounts` locally created hierarchies.
///
/// Every `dirty_every`-th account has one dirty contact; all other records are clean.
pub fn store_with_hierarchies(accounts: usize, contacts: usize, dirty_every: usize) -> TestStore {
    let store = TestStore::with_account_contact_soups();
    let pattern: Vec<(bool, Vec<bool>)> = (0..accounts)
        .map(|i| {
            let mut flags = vec![false; contacts];
            if dirty_every > 0 && i % dirty_every == 0 {
                if let Some(first) = flags.first_mut() {
                    *first = true;
                }
            }
            (false, flags)
        })
        .collect();
    create_hierarchies_with_flags(&*store, &account_names(accounts), &pattern);
    store
}

/// Create a store already holding a merged server batch.
pub fn store_with_merged(batch: &[Value]) -> TestStore {
    let store = TestStore::with_account_contact_soups();
    account_contacts_target(RelationshipType::MasterDetail)
        .save_records(&*store, batch, &SyncOptions::new())
        .expect("Failed to merge batch");
    store
}
