//! Integration tests for parent/children reconciliation against a SQLite store.

use serde_json::{json, Value};
use soupsync_engine::{
    ChildrenInfo, DirtyTracker, ParentChildrenTarget, ParentInfo, RelationshipSpec,
    RelationshipType, ScriptedRemoteSource, SyncError, SyncOptions, LOCAL, LOCALLY_CREATED,
    LOCALLY_DELETED, LOCALLY_UPDATED,
};
use soupsync_store::{IndexSpec, LocalStore, QuerySpec, SOUP_ENTRY_ID};
use soupsync_testkit::prelude::*;

fn parent_children_target(explicit_fields: bool) -> ParentChildrenTarget {
    let (parent, children) = if explicit_fields {
        (
            ParentInfo::with_fields("Parent", "ParentId", "ParentModifiedDate"),
            ChildrenInfo::with_fields(
                "Child",
                "Children",
                "ChildId",
                "ChildLastModifiedDate",
                "childrenSoup",
                "parentId",
                "parentLocalId",
            ),
        )
    } else {
        (
            ParentInfo::new("Parent"),
            ChildrenInfo::new("Child", "Children", "childrenSoup", "parentId", "parentLocalId"),
        )
    };
    ParentChildrenTarget::new(RelationshipSpec::new(
        parent,
        ["ParentName", "Title"],
        "School = 'MIT'",
        children,
        ["ChildName", "School"],
        RelationshipType::Lookup,
    ))
}

fn assert_clean(record: &serde_json::Map<String, Value>) {
    for flag in [LOCAL, LOCALLY_CREATED, LOCALLY_UPDATED, LOCALLY_DELETED] {
        assert_eq!(record[flag], json!(false), "{flag} should be false");
    }
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn fetch_query() {
    assert_eq!(
        parent_children_target(true).fetch_query(),
        "select ParentName, Title, ParentId, ParentModifiedDate, (select ChildName, School, ChildId, ChildLastModifiedDate from Children) from Parent where School = 'MIT'"
    );

    // With default id and modification date fields
    assert_eq!(
        parent_children_target(false).fetch_query(),
        "select ParentName, Title, Id, LastModifiedDate, (select ChildName, School, Id, LastModifiedDate from Children) from Parent where School = 'MIT'"
    );
}

#[test]
fn id_only_query() {
    assert_eq!(
        parent_children_target(true).id_only_query(),
        "select ParentId, (select ChildId from Children) from Parent where School = 'MIT'"
    );

    // With default id and modification date fields
    assert_eq!(
        parent_children_target(false).id_only_query(),
        "select Id, (select Id from Children) from Parent where School = 'MIT'"
    );
}

#[test]
fn dirty_ids_queries() {
    let target = parent_children_target(true);
    let tracker = target.dirty_tracker();

    assert_eq!(
        tracker.build_dirty_ids_query("ParentSoup", "IdForQuery"),
        "SELECT DISTINCT {ParentSoup:IdForQuery} FROM {ParentSoup} LEFT OUTER JOIN {childrenSoup} ON {childrenSoup:parentLocalId} = {ParentSoup:_soupEntryId} WHERE ({ParentSoup:__local__} = 'true' OR {childrenSoup:__local__} = 'true')"
    );
    assert_eq!(
        tracker.build_non_dirty_ids_query("ParentSoup", "IdForQuery"),
        "SELECT {ParentSoup:IdForQuery} FROM {ParentSoup} WHERE {ParentSoup:_soupEntryId} NOT IN (SELECT DISTINCT {ParentSoup:_soupEntryId} FROM {ParentSoup} LEFT OUTER JOIN {childrenSoup} ON {childrenSoup:parentLocalId} = {ParentSoup:_soupEntryId} WHERE ({ParentSoup:__local__} = 'true' OR {childrenSoup:__local__} = 'true'))"
    );
}

#[test]
fn construction_from_raw_query_fails() {
    let err = ParentChildrenTarget::from_query("SELECT Name FROM Account").unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

#[test]
fn definition_survives_json() {
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let restored = ParentChildrenTarget::from_json(&target.to_json().unwrap()).unwrap();
    assert_eq!(restored, target);
    assert_eq!(restored.fetch_query(), target.fetch_query());
}

// ============================================================================
// Dirty tracking
// ============================================================================

#[test]
fn dirty_and_non_dirty_ids() {
    init_test_logging();
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let h = create_accounts_and_contacts_locally(&*store, &account_names(6), 3);
    let ids: Vec<String> = h.iter().map(LocalHierarchy::account_id).collect();

    // Everything was created locally
    assert_eq!(target.dirty_ids(&*store).unwrap().len(), 6);
    assert!(target.non_dirty_ids(&*store).unwrap().is_empty());

    // h[0]: dirty account and dirty contacts
    // h[1]: clean account and dirty contacts
    // h[2]: dirty account and clean contacts
    // h[3]: clean account and clean contacts
    // h[4]: dirty account and some dirty contacts
    // h[5]: clean account and some dirty contacts
    clean_record(&*store, ACCOUNTS_SOUP, &h[1].account);
    clean_records(&*store, CONTACTS_SOUP, &h[2].contacts);
    clean_record(&*store, ACCOUNTS_SOUP, &h[3].account);
    clean_records(&*store, CONTACTS_SOUP, &h[3].contacts);
    clean_record(&*store, CONTACTS_SOUP, &h[4].contacts[0]);
    clean_record(&*store, ACCOUNTS_SOUP, &h[5].account);
    clean_record(&*store, CONTACTS_SOUP, &h[5].contacts[0]);

    let dirty = target.dirty_ids(&*store).unwrap();
    let expected: Vec<&String> = [0, 1, 2, 4, 5].iter().map(|&i| &ids[i]).collect();
    assert_eq!(dirty.len(), 5);
    for id in expected {
        assert!(dirty.contains(id));
    }

    let non_dirty = target.non_dirty_ids(&*store).unwrap();
    assert_eq!(non_dirty.into_iter().collect::<Vec<_>>(), vec![ids[3].clone()]);
}

#[test]
fn childless_parents_are_classified_by_their_own_flag() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::Lookup);
    let names = account_names(2);
    let h = create_hierarchies_with_flags(&*store, &names, &[(true, vec![]), (false, vec![])]);

    let dirty = target.dirty_ids(&*store).unwrap();
    let non_dirty = target.non_dirty_ids(&*store).unwrap();
    assert!(dirty.contains(&h[0].account_id()));
    assert!(!dirty.contains(&h[1].account_id()));
    assert!(non_dirty.contains(&h[1].account_id()));
    assert_eq!(dirty.len() + non_dirty.len(), 2);
}

#[test]
fn dirty_ids_page_through_results() {
    let store = TestStore::with_account_contact_soups();
    let spec = account_contacts_spec(RelationshipType::MasterDetail);
    create_accounts_and_contacts_locally(&*store, &account_names(5), 1);

    let ids = DirtyTracker::new(&spec)
        .with_page_size(2)
        .get_dirty_ids(&*store, ACCOUNTS_SOUP, ID)
        .unwrap();
    assert_eq!(ids.len(), 5);
}

#[test]
fn non_dirty_ids_page_through_results() {
    let store = TestStore::with_account_contact_soups();
    let spec = account_contacts_spec(RelationshipType::MasterDetail);
    let names = account_names(7);
    let flags: Vec<(bool, Vec<bool>)> = (0..7).map(|i| (i == 3, vec![false])).collect();
    let h = create_hierarchies_with_flags(&*store, &names, &flags);

    let tracker = DirtyTracker::new(&spec).with_page_size(1);
    let non_dirty = tracker.get_non_dirty_ids(&*store, ACCOUNTS_SOUP, ID).unwrap();
    let mut expected: Vec<String> = [0, 1, 2, 4, 5, 6].iter().map(|&i| h[i].account_id()).collect();
    expected.sort();
    assert_eq!(non_dirty.into_iter().collect::<Vec<_>>(), expected);

    let dirty = tracker.get_dirty_ids(&*store, ACCOUNTS_SOUP, ID).unwrap();
    assert_eq!(dirty.into_iter().collect::<Vec<_>>(), vec![h[3].account_id()]);
}

#[test]
fn dirty_ids_are_sorted() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    create_accounts_and_contacts_locally(&*store, &account_names(4), 2);

    let ids: Vec<String> = target.dirty_ids(&*store).unwrap().into_iter().collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn missing_parent_soup_is_a_configuration_error() {
    let store = TestStore::with_account_contact_soups();
    let target = parent_children_target(true);
    assert!(matches!(target.dirty_ids(&*store), Err(SyncError::Config(_))));
}

// ============================================================================
// Deletes
// ============================================================================

fn try_delete_from_local_store(relationship_type: RelationshipType, single_delete: bool) {
    let store = TestStore::with_account_contact_soups();
    let h = create_accounts_and_contacts_locally(&*store, &account_names(3), 3);
    let target = account_contacts_target(relationship_type);

    let contacts_of_first = h[0].contact_ids();
    let contacts_of_second = h[1].contact_ids();
    let contacts_of_third = h[2].contact_ids();

    if single_delete {
        assert_eq!(target.delete_record(&*store, &h[1].account).unwrap(), 1);

        assert_db_deleted(&*store, ACCOUNTS_SOUP, &[h[1].account_id()], ID);
        assert_db_exist(&*store, ACCOUNTS_SOUP, &[h[0].account_id(), h[2].account_id()], ID);

        assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_first, ID);
        assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_third, ID);
        match relationship_type {
            RelationshipType::MasterDetail => {
                assert_db_deleted(&*store, CONTACTS_SOUP, &contacts_of_second, ID)
            }
            RelationshipType::Lookup => {
                assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_second, ID)
            }
        }
    } else {
        let deleted = target
            .delete_records(&*store, [h[0].account_id(), h[2].account_id()])
            .unwrap();
        assert_eq!(deleted, 2);

        assert_db_exist(&*store, ACCOUNTS_SOUP, &[h[1].account_id()], ID);
        assert_db_deleted(&*store, ACCOUNTS_SOUP, &[h[0].account_id(), h[2].account_id()], ID);

        assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_second, ID);
        match relationship_type {
            RelationshipType::MasterDetail => {
                assert_db_deleted(&*store, CONTACTS_SOUP, &contacts_of_first, ID);
                assert_db_deleted(&*store, CONTACTS_SOUP, &contacts_of_third, ID);
            }
            RelationshipType::Lookup => {
                assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_first, ID);
                assert_db_exist(&*store, CONTACTS_SOUP, &contacts_of_third, ID);
            }
        }
    }
}

#[test]
fn delete_records_with_master_detail() {
    try_delete_from_local_store(RelationshipType::MasterDetail, false);
}

#[test]
fn delete_records_with_lookup() {
    try_delete_from_local_store(RelationshipType::Lookup, false);
}

#[test]
fn delete_record_with_master_detail() {
    try_delete_from_local_store(RelationshipType::MasterDetail, true);
}

#[test]
fn delete_record_with_lookup() {
    try_delete_from_local_store(RelationshipType::Lookup, true);
}

#[test]
fn delete_record_without_local_id_uses_remote_id() {
    let store = TestStore::with_account_contact_soups();
    let h = create_accounts_and_contacts_locally(&*store, &account_names(2), 2);
    let target = account_contacts_target(RelationshipType::MasterDetail);

    let mut unsaved = h[0].account.clone();
    unsaved.remove(SOUP_ENTRY_ID);
    target.delete_record(&*store, &unsaved).unwrap();

    assert_db_deleted(&*store, ACCOUNTS_SOUP, &[h[0].account_id()], ID);
    assert_db_deleted(&*store, CONTACTS_SOUP, &h[0].contact_ids(), ID);
    assert_db_exist(&*store, CONTACTS_SOUP, &h[1].contact_ids(), ID);
}

#[test]
fn delete_record_without_any_id_is_malformed() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let record = json!({"Name": "nobody"}).as_object().cloned().unwrap();
    assert!(matches!(
        target.delete_record(&*store, &record),
        Err(SyncError::MalformedRecord(_))
    ));
}

#[test]
fn delete_records_escapes_quotes() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let record = json!({"Id": "o'brien", "Name": "quoted"}).as_object().cloned().unwrap();
    store.create(ACCOUNTS_SOUP, record).unwrap();

    target.delete_records(&*store, ["o'brien"]).unwrap();
    assert_db_deleted(&*store, ACCOUNTS_SOUP, &["o'brien".to_string()], ID);
}

#[test]
fn delete_records_with_no_ids_is_a_no_op() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    create_accounts_and_contacts_locally(&*store, &account_names(1), 1);

    assert_eq!(target.delete_records(&*store, Vec::<String>::new()).unwrap(), 0);
    let all = QuerySpec::smart(format!("SELECT {{{ACCOUNTS_SOUP}:{ID}}} FROM {{{ACCOUNTS_SOUP}}}"), 10);
    assert_eq!(store.count(&all).unwrap(), 1);
}

#[test]
fn delete_records_counts_only_existing_parents() {
    let store = TestStore::with_account_contact_soups();
    let h = create_accounts_and_contacts_locally(&*store, &account_names(2), 1);
    let target = account_contacts_target(RelationshipType::MasterDetail);

    let deleted = target
        .delete_records(&*store, [h[0].account_id(), "never_synced".to_string()])
        .unwrap();
    assert_eq!(deleted, 1);
    assert_db_exist(&*store, ACCOUNTS_SOUP, &[h[1].account_id()], ID);
}

// ============================================================================
// Sparsely indexed soups
// ============================================================================

/// Registers the account and contact soups with only the given indexes.
fn store_indexed_on(indexes: &[IndexSpec]) -> TestStore {
    let store = TestStore::memory();
    for soup in [ACCOUNTS_SOUP, CONTACTS_SOUP] {
        store.register_soup(soup, indexes).unwrap();
    }
    store
}

fn soup_size(store: &TestStore, soup: &str) -> usize {
    let all = QuerySpec::smart(format!("SELECT {{{soup}:{SOUP_ENTRY_ID}}} FROM {{{soup}}}"), 10);
    store.count(&all).unwrap()
}

#[test]
fn unindexed_local_flag_still_marks_parents_dirty() {
    let store = store_indexed_on(&[IndexSpec::string(ID)]);
    let target = account_contacts_target(RelationshipType::MasterDetail);
    for record in [
        json!({"Id": "local_1", "__local__": true, "__locally_created__": true}),
        json!({"Id": "remote_1", "__local__": false, "__locally_created__": false}),
    ] {
        store
            .create(ACCOUNTS_SOUP, record.as_object().cloned().unwrap())
            .unwrap();
    }

    let dirty = target.dirty_ids(&*store).unwrap();
    let non_dirty = target.non_dirty_ids(&*store).unwrap();
    assert_eq!(dirty.into_iter().collect::<Vec<_>>(), vec!["local_1".to_string()]);
    assert_eq!(non_dirty.into_iter().collect::<Vec<_>>(), vec!["remote_1".to_string()]);

    // The remote knows neither parent; only the clean one may go
    let remote = ScriptedRemoteSource::new();
    remote.respond(target.id_only_query(), vec![]);
    let removed = target
        .clean_ghosts(&*store, &remote, &SyncOptions::new())
        .unwrap();
    assert_eq!(removed, 1);
    assert_db_exist(&*store, ACCOUNTS_SOUP, &["local_1".to_string()], ID);
    assert_db_deleted(&*store, ACCOUNTS_SOUP, &["remote_1".to_string()], ID);
}

#[test]
fn numeric_remote_ids_are_deleted() {
    let store = store_indexed_on(&[IndexSpec::string(NAME)]);
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let batch = vec![json!({"Id": 42, "Name": "numeric", "Contacts": [{"Id": 7}]})];
    target
        .save_records(&*store, &batch, &SyncOptions::new())
        .unwrap();
    assert_eq!(soup_size(&store, ACCOUNTS_SOUP), 1);
    assert_eq!(soup_size(&store, CONTACTS_SOUP), 1);

    let remote = ScriptedRemoteSource::new();
    remote.respond(target.id_only_query(), vec![]);
    let removed = target
        .clean_ghosts(&*store, &remote, &SyncOptions::new())
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(soup_size(&store, ACCOUNTS_SOUP), 0);
    assert_eq!(soup_size(&store, CONTACTS_SOUP), 0);
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn save_records_to_local_store() {
    init_test_logging();
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let server = ServerHierarchy::generate(3, 3);

    let stats = target
        .save_records(&*store, &server.to_batch(), &SyncOptions::new())
        .unwrap();
    assert_eq!(stats.parents, 3);
    assert_eq!(stats.children, 9);

    let account_ids = server.account_ids();
    let accounts = query_with_in_clause(&*store, ACCOUNTS_SOUP, ID, &account_ids, Some(SOUP_ENTRY_ID));
    assert_eq!(accounts.len(), 3);

    for (i, account) in accounts.iter().enumerate() {
        assert_eq!(account[ID], json!(account_ids[i]));
        assert_eq!(account[ATTRIBUTES][TYPE], json!(ACCOUNT));
        assert!(!account.contains_key(CONTACTS));
        assert_clean(account);

        let contacts = query_with_in_clause(
            &*store,
            CONTACTS_SOUP,
            ACCOUNT_ID,
            &[account_ids[i].clone()],
            Some(SOUP_ENTRY_ID),
        );
        let expected_ids = server.contact_ids(i);
        assert_eq!(contacts.len(), expected_ids.len());
        for (j, contact) in contacts.iter().enumerate() {
            assert_eq!(contact[ID], json!(expected_ids[j]));
            assert_eq!(contact[ATTRIBUTES][TYPE], json!(CONTACT));
            assert_eq!(contact[ACCOUNT_ID], json!(account_ids[i]));
            assert_eq!(contact[ACCOUNT_LOCAL_ID], account[SOUP_ENTRY_ID]);
            assert_clean(contact);
        }
    }
}

#[test]
fn save_records_accepts_subquery_results() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::Lookup);
    let server = ServerHierarchy::generate(2, 2);

    let stats = target
        .save_records(&*store, &server.to_subquery_batch(), &SyncOptions::new())
        .unwrap();
    assert_eq!(stats.children, 4);
    assert_db_exist(&*store, CONTACTS_SOUP, &server.contact_ids(1), ID);
}

#[test]
fn saving_again_updates_in_place() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let server = ServerHierarchy::generate(2, 2);
    let batch = server.to_batch();

    target.save_records(&*store, &batch, &SyncOptions::new()).unwrap();
    let before = query_with_in_clause(&*store, ACCOUNTS_SOUP, ID, &server.account_ids(), Some(SOUP_ENTRY_ID));
    target.save_records(&*store, &batch, &SyncOptions::new()).unwrap();
    let after = query_with_in_clause(&*store, ACCOUNTS_SOUP, ID, &server.account_ids(), Some(SOUP_ENTRY_ID));

    assert_eq!(after.len(), 2);
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b[SOUP_ENTRY_ID], a[SOUP_ENTRY_ID]);
    }
    let contacts = QuerySpec::smart(format!("SELECT {{{CONTACTS_SOUP}:{ID}}} FROM {{{CONTACTS_SOUP}}}"), 10);
    assert_eq!(store.count(&contacts).unwrap(), 4);
}

#[test]
fn merge_links_children_of_locally_known_parent() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let h = create_accounts_and_contacts_locally(&*store, &account_names(1), 0);

    let batch = vec![json!({
        "Id": h[0].account_id(),
        "Name": "From server",
        "Contacts": [{"Id": "003000000000001", "Name": "New contact"}]
    })];
    target.save_records(&*store, &batch, &SyncOptions::new()).unwrap();

    let accounts = query_with_in_clause(&*store, ACCOUNTS_SOUP, ID, &[h[0].account_id()], None);
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0][SOUP_ENTRY_ID], h[0].account[SOUP_ENTRY_ID]);
    assert_eq!(accounts[0][NAME], json!("From server"));
    assert_clean(&accounts[0]);

    let contacts = query_with_in_clause(
        &*store,
        CONTACTS_SOUP,
        ID,
        &["003000000000001".to_string()],
        None,
    );
    assert_eq!(contacts[0][ACCOUNT_LOCAL_ID], h[0].account[SOUP_ENTRY_ID]);
}

#[test]
fn failed_child_rolls_back_its_parent() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);

    // Two local contacts sharing an id make the child upsert ambiguous.
    for _ in 0..2 {
        let contact = json!({"Id": "003DUPLICATE", "Name": "twin"}).as_object().cloned().unwrap();
        store.create(CONTACTS_SOUP, contact).unwrap();
    }

    let batch = vec![
        json!({"Id": "001GOOD", "Name": "ok", "Contacts": [{"Id": "003FINE"}]}),
        json!({"Id": "001BAD", "Name": "bad", "Contacts": [{"Id": "003DUPLICATE"}]}),
    ];
    let err = target
        .save_records(&*store, &batch, &SyncOptions::new())
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));

    assert_db_exist(&*store, ACCOUNTS_SOUP, &["001GOOD".to_string()], ID);
    assert_db_deleted(&*store, ACCOUNTS_SOUP, &["001BAD".to_string()], ID);
}

#[test]
fn parent_without_id_is_malformed() {
    let store = TestStore::with_account_contact_soups();
    let target = account_contacts_target(RelationshipType::MasterDetail);
    let batch = vec![json!({"Name": "no id", "Contacts": []})];
    assert!(matches!(
        target.save_records(&*store, &batch, &SyncOptions::new()),
        Err(SyncError::MalformedRecord(_))
    ));
}

// ============================================================================
// Watermark
// ============================================================================

#[test]
fn latest_modification_timestamp() {
    let time_stamps: [i64; 4] = [100_000_000, 200_000_000, 300_000_000, 400_000_000];

    let server = ServerHierarchy::generate(4, 3)
        .with_timestamps(
            "AccountTimeStamp1",
            |i| time_stamps[i % 4],
            "ContactTimeStamp1",
            |_, _| time_stamps[1],
        )
        .with_timestamps(
            "AccountTimeStamp2",
            |_| time_stamps[0],
            "ContactTimeStamp2",
            |_, j| time_stamps[j % 4],
        );
    let records = server.to_batch();

    let latest = |account_field: &str, contact_field: &str| {
        ParentChildrenTarget::new(account_contacts_spec_with_dates(
            RelationshipType::Lookup,
            account_field,
            contact_field,
        ))
        .latest_modification_timestamp(&records)
        .as_millis()
    };

    assert_eq!(latest("AccountTimeStamp1", "ContactTimeStamp1"), Some(time_stamps[3]));
    assert_eq!(latest("AccountTimeStamp1", "ContactTimeStamp2"), Some(time_stamps[3]));
    assert_eq!(latest("AccountTimeStamp2", "ContactTimeStamp1"), Some(time_stamps[1]));
    assert_eq!(latest("AccountTimeStamp2", "ContactTimeStamp2"), Some(time_stamps[2]));
}

#[test]
fn latest_modification_timestamp_of_empty_batch() {
    let target = account_contacts_target(RelationshipType::Lookup);
    let watermark = target.latest_modification_timestamp(&[]);
    assert!(watermark.is_empty());
    assert_eq!(watermark.latest(), None);
}
