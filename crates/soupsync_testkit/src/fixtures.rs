//! Test fixtures and store helpers.
//!
//! Provides an account/contact pair of soups, locally created hierarchies
//! with sync flags set, and server-shaped batches to merge.

use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};
use soupsync_engine::{
    format_timestamp, ChildrenInfo, Expr, ParentChildrenTarget, ParentInfo, RelationshipSpec,
    RelationshipType, LOCAL, LOCALLY_CREATED, LOCALLY_DELETED, LOCALLY_UPDATED,
};
use soupsync_store::{IndexSpec, LocalStore, QuerySpec, Record, SqliteStore, SOUP, SOUP_ENTRY_ID};
use std::path::PathBuf;
use tempfile::TempDir;

/// Soup holding accounts.
pub const ACCOUNTS_SOUP: &str = "accounts";
/// Soup holding contacts.
pub const CONTACTS_SOUP: &str = "contacts";
/// Parent entity type.
pub const ACCOUNT: &str = "Account";
/// Child entity type.
pub const CONTACT: &str = "Contact";
/// Relationship name of contacts under an account.
pub const CONTACTS: &str = "Contacts";
/// Remote id field.
pub const ID: &str = "Id";
/// Name field.
pub const NAME: &str = "Name";
/// Description field.
pub const DESCRIPTION: &str = "Description";
/// Remote type metadata field.
pub const ATTRIBUTES: &str = "attributes";
/// Type key inside [`ATTRIBUTES`].
pub const TYPE: &str = "type";
/// Contact field holding the account's remote id.
pub const ACCOUNT_ID: &str = "AccountId";
/// Contact field holding the account's local row id.
pub const ACCOUNT_LOCAL_ID: &str = "AccountLocalId";
/// Default modification-date field.
pub const LAST_MODIFIED_DATE: &str = "LastModifiedDate";

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: SqliteStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: SqliteStore::open_in_memory().expect("Failed to open in-memory store"),
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test store.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SqliteStore::open(&temp_dir.path().join("store.db"))
            .expect("Failed to open file store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("store.db"))
    }

    /// Creates an in-memory store with the account and contact soups.
    pub fn with_account_contact_soups() -> Self {
        let store = Self::memory();
        create_accounts_soup(&store.store);
        create_contacts_soup(&store.store);
        store
    }
}

impl std::ops::Deref for TestStore {
    type Target = SqliteStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Registers the accounts soup.
pub fn create_accounts_soup<S: LocalStore>(store: &S) {
    store
        .register_soup(
            ACCOUNTS_SOUP,
            &[
                IndexSpec::string(ID),
                IndexSpec::string(NAME),
                IndexSpec::string(DESCRIPTION),
                IndexSpec::string(LOCAL),
            ],
        )
        .expect("Failed to register accounts soup");
}

/// Registers the contacts soup.
pub fn create_contacts_soup<S: LocalStore>(store: &S) {
    store
        .register_soup(
            CONTACTS_SOUP,
            &[
                IndexSpec::string(ID),
                IndexSpec::string(NAME),
                IndexSpec::string(LOCAL),
                IndexSpec::string(ACCOUNT_ID),
                IndexSpec::integer(ACCOUNT_LOCAL_ID),
            ],
        )
        .expect("Failed to register contacts soup");
}

/// Account/contact relationship with default modification-date fields.
pub fn account_contacts_spec(relationship_type: RelationshipType) -> RelationshipSpec {
    account_contacts_spec_with_dates(relationship_type, LAST_MODIFIED_DATE, LAST_MODIFIED_DATE)
}

/// Account/contact relationship with explicit modification-date fields.
pub fn account_contacts_spec_with_dates(
    relationship_type: RelationshipType,
    account_modification_date_field: &str,
    contact_modification_date_field: &str,
) -> RelationshipSpec {
    RelationshipSpec::new(
        ParentInfo::with_fields(ACCOUNT, ID, account_modification_date_field)
            .with_soup(ACCOUNTS_SOUP),
        [ID, NAME, DESCRIPTION],
        "",
        ChildrenInfo::with_fields(
            CONTACT,
            CONTACTS,
            ID,
            contact_modification_date_field,
            CONTACTS_SOUP,
            ACCOUNT_ID,
            ACCOUNT_LOCAL_ID,
        ),
        [NAME],
        relationship_type,
    )
}

/// Account/contact target with default modification-date fields.
pub fn account_contacts_target(relationship_type: RelationshipType) -> ParentChildrenTarget {
    ParentChildrenTarget::new(account_contacts_spec(relationship_type))
}

/// Creates an id that looks like a locally assigned one.
pub fn create_local_id() -> String {
    format!("local_{}", uuid::Uuid::new_v4().simple())
}

/// Creates a unique record name for an entity type.
pub fn create_record_name(entity: &str) -> String {
    format!("{entity}_{}", uuid::Uuid::new_v4().simple())
}

fn attributes(entity: &str) -> Value {
    let mut attributes = Map::new();
    attributes.insert(TYPE.into(), Value::from(entity));
    Value::Object(attributes)
}

fn set_flags(record: &mut Record, dirty: bool) {
    record.insert(LOCAL.into(), Value::Bool(dirty));
    record.insert(LOCALLY_CREATED.into(), Value::Bool(dirty));
    record.insert(LOCALLY_UPDATED.into(), Value::Bool(false));
    record.insert(LOCALLY_DELETED.into(), Value::Bool(false));
}

/// An account and its contacts as saved in the local store.
#[derive(Debug, Clone)]
pub struct LocalHierarchy {
    /// The saved account.
    pub account: Record,
    /// The saved contacts, in creation order.
    pub contacts: Vec<Record>,
}

impl LocalHierarchy {
    /// The account's remote id.
    pub fn account_id(&self) -> String {
        string_field(&self.account, ID)
    }

    /// The contacts' remote ids.
    pub fn contact_ids(&self) -> Vec<String> {
        self.contacts.iter().map(|c| string_field(c, ID)).collect()
    }
}

fn string_field(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(Value::as_str)
        .expect("record has a string field")
        .to_string()
}

/// Creates locally created accounts, all dirty.
pub fn create_accounts_locally<S: LocalStore>(store: &S, names: &[String]) -> Vec<Record> {
    names
        .iter()
        .map(|name| create_account(store, name, true))
        .collect()
}

fn create_account<S: LocalStore>(store: &S, name: &str, dirty: bool) -> Record {
    let mut account = Map::new();
    account.insert(ID.into(), Value::from(create_local_id()));
    account.insert(NAME.into(), Value::from(name));
    account.insert(DESCRIPTION.into(), Value::from(format!("Description_{name}")));
    account.insert(ATTRIBUTES.into(), attributes(ACCOUNT));
    set_flags(&mut account, dirty);
    store
        .create(ACCOUNTS_SOUP, account)
        .expect("Failed to create account")
}

fn create_contact<S: LocalStore>(store: &S, account: &Record, index: usize, dirty: bool) -> Record {
    let account_name = account.get(NAME).and_then(Value::as_str).unwrap_or_default();
    let mut contact = Map::new();
    contact.insert(ID.into(), Value::from(create_local_id()));
    contact.insert(NAME.into(), Value::from(format!("Contact_{account_name}_{index}")));
    contact.insert(ATTRIBUTES.into(), attributes(CONTACT));
    set_flags(&mut contact, dirty);
    contact.insert(ACCOUNT_ID.into(), account[ID].clone());
    contact.insert(ACCOUNT_LOCAL_ID.into(), account[SOUP_ENTRY_ID].clone());
    store
        .create(CONTACTS_SOUP, contact)
        .expect("Failed to create contact")
}

/// Creates locally created accounts, each with `contacts_per_account` contacts, all dirty.
pub fn create_accounts_and_contacts_locally<S: LocalStore>(
    store: &S,
    names: &[String],
    contacts_per_account: usize,
) -> Vec<LocalHierarchy> {
    let pattern: Vec<(bool, Vec<bool>)> = names
        .iter()
        .map(|_| (true, vec![true; contacts_per_account]))
        .collect();
    create_hierarchies_with_flags(store, names, &pattern)
}

/// Creates accounts and contacts with explicit dirty flags.
///
/// `pattern[i]` holds the dirty flag of account `i` and of each of its contacts.
pub fn create_hierarchies_with_flags<S: LocalStore>(
    store: &S,
    names: &[String],
    pattern: &[(bool, Vec<bool>)],
) -> Vec<LocalHierarchy> {
    names
        .iter()
        .zip(pattern)
        .map(|(name, (account_dirty, contacts_dirty))| {
            let account = create_account(store, name, *account_dirty);
            let contacts = contacts_dirty
                .iter()
                .enumerate()
                .map(|(i, dirty)| create_contact(store, &account, i, *dirty))
                .collect();
            LocalHierarchy { account, contacts }
        })
        .collect()
}

/// Creates `count` unique account names.
pub fn account_names(count: usize) -> Vec<String> {
    (0..count).map(|_| create_record_name(ACCOUNT)).collect()
}

/// Marks a saved record clean and writes it back.
pub fn clean_record<S: LocalStore>(store: &S, soup: &str, record: &Record) -> Record {
    let mut record = record.clone();
    set_flags(&mut record, false);
    store
        .upsert(soup, record, SOUP_ENTRY_ID)
        .expect("Failed to clean record")
}

/// Marks saved records clean and writes them back.
pub fn clean_records<S: LocalStore>(store: &S, soup: &str, records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .map(|record| clean_record(store, soup, record))
        .collect()
}

/// Returns the records of `soup` whose `field` is one of `values`.
pub fn query_with_in_clause<S: LocalStore>(
    store: &S,
    soup: &str,
    field: &str,
    values: &[String],
    order_by: Option<&str>,
) -> Vec<Record> {
    let values: Vec<String> = values.iter().map(|v| Expr::text(v.as_str()).to_string()).collect();
    let mut sql = format!(
        "SELECT {{{soup}:{SOUP}}} FROM {{{soup}}} WHERE {{{soup}:{field}}} IN ({})",
        values.join(", ")
    );
    if let Some(order_by) = order_by {
        sql.push_str(&format!(" ORDER BY {{{soup}:{order_by}}} ASC"));
    }

    store
        .query(&QuerySpec::smart(sql, usize::MAX), 0)
        .expect("Failed to query")
        .into_iter()
        .map(|row| {
            row.into_iter()
                .next()
                .and_then(|v| v.as_object().cloned())
                .expect("row holds a record")
        })
        .collect()
}

/// Asserts that every record with `field` in `values` exists in `soup`.
pub fn assert_db_exist<S: LocalStore>(store: &S, soup: &str, values: &[String], field: &str) {
    let found = query_with_in_clause(store, soup, field, values, None);
    assert_eq!(
        found.len(),
        values.len(),
        "expected {} records in {soup}, found {}",
        values.len(),
        found.len()
    );
}

/// Asserts that no record with `field` in `values` exists in `soup`.
pub fn assert_db_deleted<S: LocalStore>(store: &S, soup: &str, values: &[String], field: &str) {
    let found = query_with_in_clause(store, soup, field, values, None);
    assert!(found.is_empty(), "expected no records in {soup}, found {}", found.len());
}

/// Accounts and contacts shaped like a remote response.
#[derive(Debug, Clone)]
pub struct ServerHierarchy {
    /// Accounts without their contacts.
    pub accounts: Vec<Record>,
    /// Contacts of each account.
    pub contacts: Vec<Vec<Record>>,
}

impl ServerHierarchy {
    /// Generates `accounts` accounts with `contacts_per_account` contacts each.
    ///
    /// Records carry no sync flags.
    pub fn generate(accounts: usize, contacts_per_account: usize) -> Self {
        let mut hierarchy = Self {
            accounts: Vec::with_capacity(accounts),
            contacts: Vec::with_capacity(accounts),
        };
        for i in 0..accounts {
            let account_id = create_local_id();
            let mut account = Map::new();
            account.insert(ID.into(), Value::from(account_id.clone()));
            account.insert(NAME.into(), Value::from(format!("Account_{i}")));
            account.insert(ATTRIBUTES.into(), attributes(ACCOUNT));

            let contacts = (0..contacts_per_account)
                .map(|j| {
                    let mut contact = Map::new();
                    contact.insert(ID.into(), Value::from(create_local_id()));
                    contact.insert(NAME.into(), Value::from(format!("Contact_{i}_{j}")));
                    contact.insert(ATTRIBUTES.into(), attributes(CONTACT));
                    contact.insert(ACCOUNT_ID.into(), Value::from(account_id.clone()));
                    contact
                })
                .collect();

            hierarchy.accounts.push(account);
            hierarchy.contacts.push(contacts);
        }
        hierarchy
    }

    /// Sets a timestamp field on every account and contact.
    ///
    /// `account_millis(i)` and `contact_millis(i, j)` give epoch milliseconds.
    pub fn with_timestamps(
        mut self,
        account_field: &str,
        account_millis: impl Fn(usize) -> i64,
        contact_field: &str,
        contact_millis: impl Fn(usize, usize) -> i64,
    ) -> Self {
        for (i, account) in self.accounts.iter_mut().enumerate() {
            account.insert(account_field.into(), Value::from(timestamp(account_millis(i))));
        }
        for (i, contacts) in self.contacts.iter_mut().enumerate() {
            for (j, contact) in contacts.iter_mut().enumerate() {
                contact.insert(contact_field.into(), Value::from(timestamp(contact_millis(i, j))));
            }
        }
        self
    }

    /// Account ids in order.
    pub fn account_ids(&self) -> Vec<String> {
        self.accounts.iter().map(|a| string_field(a, ID)).collect()
    }

    /// Contact ids of account `i`.
    pub fn contact_ids(&self, i: usize) -> Vec<String> {
        self.contacts[i].iter().map(|c| string_field(c, ID)).collect()
    }

    /// Records with contacts nested as a bare array.
    pub fn to_batch(&self) -> Vec<Value> {
        self.nest(Value::Array)
    }

    /// Records with contacts nested as a sub-query result.
    pub fn to_subquery_batch(&self) -> Vec<Value> {
        self.nest(|contacts| {
            json!({
                "totalSize": contacts.len(),
                "done": true,
                "records": contacts,
            })
        })
    }

    fn nest(&self, wrap: impl Fn(Vec<Value>) -> Value) -> Vec<Value> {
        self.accounts
            .iter()
            .zip(&self.contacts)
            .map(|(account, contacts)| {
                let mut record = account.clone();
                let contacts = contacts.iter().cloned().map(Value::Object).collect();
                record.insert(CONTACTS.into(), wrap(contacts));
                Value::Object(record)
            })
            .collect()
    }
}

/// Formats epoch milliseconds as a remote timestamp.
pub fn timestamp(millis: i64) -> String {
    format_timestamp(
        Utc.timestamp_millis_opt(millis)
            .single()
            .expect("valid timestamp"),
    )
}
