//! # Soupsync Store
//!
//! Local soup store contract and implementations for soupsync.
//!
//! A *soup* is a named collection of JSON records. Every record gets a
//! store-assigned local row id (`_soupEntryId`) distinct from any remote id
//! it may carry. Soups are queried with *smart SQL*: ordinary SQL in which
//! `{soup}` names a soup and `{soup:path}` names a field of its records.
//!
//! ## Design Principles
//!
//! - The sync engine only emits smart SQL; the store owns its translation
//! - Registered index paths are projected into typed columns
//! - Stores must be `Send + Sync` so sync runs for different soups can share one
//! - Mutations can be grouped with [`LocalStore::in_transaction`]
//!
//! ## Available Stores
//!
//! - [`SqliteStore`] - SQLite-backed soup store, in memory or on disk
//!
//! ## Example
//!
//! ```rust
//! use soupsync_store::{IndexSpec, LocalStore, QuerySpec, SqliteStore};
//! use serde_json::json;
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! store.register_soup("accounts", &[IndexSpec::string("Id")]).unwrap();
//!
//! let record = json!({"Id": "001", "Name": "Acme"});
//! let saved = store
//!     .upsert("accounts", record.as_object().unwrap().clone(), "Id")
//!     .unwrap();
//! assert!(saved.contains_key("_soupEntryId"));
//!
//! let query = QuerySpec::smart("SELECT {accounts:Name} FROM {accounts}", 10);
//! let rows = store.query(&query, 0).unwrap();
//! assert_eq!(rows[0][0], json!("Acme"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod smart_sql;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use store::{
    IndexSpec, IndexType, LocalStore, QuerySpec, Record, SOUP, SOUP_ENTRY_ID,
    SOUP_LAST_MODIFIED_DATE,
};
