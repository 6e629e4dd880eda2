//! Local store trait definition.

use crate::error::{StoreError, StoreResult};
use serde_json::{Map, Value};

/// A single soup record: an ordered mapping of field name to JSON value.
pub type Record = Map<String, Value>;

/// Field holding the store-assigned local row id of a record.
pub const SOUP_ENTRY_ID: &str = "_soupEntryId";

/// Field holding the time (epoch millis) a record was last written locally.
pub const SOUP_LAST_MODIFIED_DATE: &str = "_soupLastModifiedDate";

/// Pseudo-path selecting the whole record in a smart query.
pub const SOUP: &str = "_soup";

/// Column type of an index projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Text column. Booleans project as `'true'` / `'false'`.
    String,
    /// Integer column.
    Integer,
    /// Floating point column.
    Floating,
}

impl IndexType {
    /// SQL column type used for the projection.
    pub fn sql_type(&self) -> &'static str {
        match self {
            IndexType::String => "TEXT",
            IndexType::Integer => "INTEGER",
            IndexType::Floating => "REAL",
        }
    }

    /// Stable name used when persisting the index map.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::String => "string",
            IndexType::Integer => "integer",
            IndexType::Floating => "floating",
        }
    }

    /// Parses a persisted index type name.
    pub fn parse(name: &str) -> StoreResult<Self> {
        match name {
            "string" => Ok(IndexType::String),
            "integer" => Ok(IndexType::Integer),
            "floating" => Ok(IndexType::Floating),
            other => Err(StoreError::invalid_query(format!(
                "unknown index type: {other}"
            ))),
        }
    }
}

/// An indexed path of a soup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Dotted path into the record (`attributes.type`).
    pub path: String,
    /// Projection column type.
    pub index_type: IndexType,
}

impl IndexSpec {
    /// Creates an index spec.
    pub fn new(path: impl Into<String>, index_type: IndexType) -> Self {
        Self {
            path: path.into(),
            index_type,
        }
    }

    /// Creates a string index spec.
    pub fn string(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::String)
    }

    /// Creates an integer index spec.
    pub fn integer(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::Integer)
    }

    /// Creates a floating point index spec.
    pub fn floating(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::Floating)
    }
}

/// A smart query and the page size used to page through its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Smart SQL text.
    pub smart_sql: String,
    /// Maximum number of rows per page.
    pub page_size: usize,
}

impl QuerySpec {
    /// Creates a smart query spec.
    pub fn smart(smart_sql: impl Into<String>, page_size: usize) -> Self {
        Self {
            smart_sql: smart_sql.into(),
            page_size,
        }
    }
}

/// A local soup store consumed by the sync engine.
///
/// # Invariants
///
/// - `create` and `upsert` return the saved record stamped with
///   [`SOUP_ENTRY_ID`] and [`SOUP_LAST_MODIFIED_DATE`]
/// - an upsert that matches an existing entry keeps its local row id
/// - failures are reported, never swallowed or retried
/// - stores must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::SqliteStore`]
pub trait LocalStore: Send + Sync {
    /// Registers a soup with the given index specs.
    ///
    /// Registering an already registered soup is a no-op.
    fn register_soup(&self, name: &str, indexes: &[IndexSpec]) -> StoreResult<()>;

    /// Returns true if the soup is registered.
    fn has_soup(&self, name: &str) -> StoreResult<bool>;

    /// Drops a soup and all of its entries.
    fn drop_soup(&self, name: &str) -> StoreResult<()>;

    /// Runs a smart query and returns one page of rows.
    ///
    /// Selecting `{soup:_soup}` yields the whole record as a JSON object.
    fn query(&self, query: &QuerySpec, page_index: usize) -> StoreResult<Vec<Vec<Value>>>;

    /// Counts the rows a smart query returns.
    fn count(&self, query: &QuerySpec) -> StoreResult<usize>;

    /// Inserts a new entry.
    fn create(&self, soup: &str, record: Record) -> StoreResult<Record>;

    /// Updates the entry matching `external_id_path`, or inserts one.
    ///
    /// When `external_id_path` is [`SOUP_ENTRY_ID`] the record's own local
    /// row id selects the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if more than one entry matches the external id.
    fn upsert(&self, soup: &str, record: Record, external_id_path: &str) -> StoreResult<Record>;

    /// Retrieves entries by local row id, in id order.
    fn retrieve(&self, soup: &str, entry_ids: &[i64]) -> StoreResult<Vec<Record>>;

    /// Deletes entries by local row id and returns how many existed.
    fn delete(&self, soup: &str, entry_ids: &[i64]) -> StoreResult<usize>;

    /// Deletes the entries whose local row ids a smart query selects.
    ///
    /// The query must select a single `{soup:_soupEntryId}` column. Returns
    /// the number of entries deleted.
    fn delete_by_query(&self, soup: &str, query: &QuerySpec) -> StoreResult<usize>;

    /// Runs `f` as one transaction: committed on `Ok`, rolled back on `Err`.
    ///
    /// Transactions nest; an inner failure that the caller recovers from
    /// only rolls back the inner region.
    fn in_transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce() -> Result<R, E>;
}

/// Looks up a dotted path in a record.
pub(crate) fn lookup_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
