//! SQLite-backed soup store.

use crate::error::{StoreError, StoreResult};
use crate::smart_sql::{translate, IndexColumn, SoupLayout};
use crate::store::{
    lookup_path, IndexSpec, IndexType, LocalStore, QuerySpec, Record, SOUP_ENTRY_ID,
    SOUP_LAST_MODIFIED_DATE,
};
use chrono::Utc;
use parking_lot::{ReentrantMutex, RwLock};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A soup store backed by a SQLite database.
///
/// Each soup lives in its own table (`TABLE_<n>`) holding the record as JSON
/// next to one typed projection column per registered index path. Smart
/// queries are translated against that layout before they run.
///
/// # Transactions
///
/// [`LocalStore::in_transaction`] opens a savepoint, so transactions nest.
/// The connection sits behind a reentrant lock held for the whole
/// transaction: calls made by the transaction body on the same thread go
/// through, other threads wait.
///
/// # Example
///
/// ```rust
/// use soupsync_store::{IndexSpec, LocalStore, SqliteStore};
///
/// let store = SqliteStore::open_in_memory().unwrap();
/// store.register_soup("contacts", &[IndexSpec::string("Id")]).unwrap();
/// assert!(store.has_soup("contacts").unwrap());
/// ```
pub struct SqliteStore {
    conn: ReentrantMutex<Connection>,
    soups: RwLock<HashMap<String, SoupLayout>>,
    next_savepoint: AtomicU64,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its soup
    /// registry cannot be read.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS soup_names (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                soupName TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS soup_index_map (
                soupName TEXT NOT NULL,
                path TEXT NOT NULL,
                columnName TEXT NOT NULL,
                columnType TEXT NOT NULL
            );
            ",
        )?;
        let soups = load_layouts(&conn)?;
        debug!(soups = soups.len(), "opened soup store");

        Ok(Self {
            conn: ReentrantMutex::new(conn),
            soups: RwLock::new(soups),
            next_savepoint: AtomicU64::new(0),
        })
    }

    /// Returns the names of all registered soups.
    pub fn soup_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.soups.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn layout(&self, soup: &str) -> StoreResult<SoupLayout> {
        self.soups
            .read()
            .get(soup)
            .cloned()
            .ok_or_else(|| StoreError::soup_not_found(soup))
    }

    fn translate(&self, query: &QuerySpec) -> StoreResult<String> {
        translate(&query.smart_sql, &self.soups.read())
    }

    fn insert(&self, layout: &SoupLayout, mut record: Record) -> StoreResult<Record> {
        self.in_transaction(|| -> StoreResult<Record> {
            let conn = self.conn.lock();
            let now = Utc::now().timestamp_millis();

            let mut columns = vec!["soup", "created", "lastModified"];
            columns.extend(layout.columns.iter().map(|c| c.column.as_str()));
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                layout.table,
                columns.join(", "),
                placeholders
            );

            let mut values = vec![
                SqlValue::Text("{}".into()),
                SqlValue::Integer(now),
                SqlValue::Integer(now),
            ];
            values.extend(projections(layout, &record));
            conn.execute(&sql, params_from_iter(values.iter()))?;

            let entry_id = conn.last_insert_rowid();
            record.insert(SOUP_ENTRY_ID.into(), Value::from(entry_id));
            record.insert(SOUP_LAST_MODIFIED_DATE.into(), Value::from(now));
            conn.execute(
                &format!("UPDATE {} SET soup = ?1 WHERE id = ?2", layout.table),
                params![serde_json::to_string(&record)?, entry_id],
            )?;
            Ok(record)
        })
    }

    fn update(
        &self,
        soup: &str,
        layout: &SoupLayout,
        entry_id: i64,
        mut record: Record,
    ) -> StoreResult<Record> {
        let conn = self.conn.lock();
        let now = Utc::now().timestamp_millis();
        record.insert(SOUP_ENTRY_ID.into(), Value::from(entry_id));
        record.insert(SOUP_LAST_MODIFIED_DATE.into(), Value::from(now));

        let mut assignments = vec!["soup = ?".to_string(), "lastModified = ?".to_string()];
        assignments.extend(layout.columns.iter().map(|c| format!("{} = ?", c.column)));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            layout.table,
            assignments.join(", ")
        );

        let mut values = vec![
            SqlValue::Text(serde_json::to_string(&record)?),
            SqlValue::Integer(now),
        ];
        values.extend(projections(layout, &record));
        values.push(SqlValue::Integer(entry_id));

        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound {
                soup: soup.to_string(),
                entry_id,
            });
        }
        Ok(record)
    }

    fn find_by_external_id(
        &self,
        soup: &str,
        layout: &SoupLayout,
        path: &str,
        value: &Value,
    ) -> StoreResult<Option<i64>> {
        let (expr, param) = match layout.column_for(path) {
            Some(col) => (col.column.clone(), project(Some(value), col.index_type)),
            None => (
                format!("json_extract(soup, '$.{}')", path.replace('\'', "''")),
                json_scalar(value),
            ),
        };

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM {} WHERE {} = ?1",
            layout.table, expr
        ))?;
        let ids = stmt
            .query_map([param], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => Err(StoreError::AmbiguousExternalId {
                soup: soup.to_string(),
                path: path.to_string(),
                value: value.to_string(),
                count: ids.len(),
            }),
        }
    }
}

impl LocalStore for SqliteStore {
    fn register_soup(&self, name: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        if self.soups.read().contains_key(name) {
            return Ok(());
        }

        let layout = self.in_transaction(|| -> StoreResult<SoupLayout> {
            let conn = self.conn.lock();
            conn.execute("INSERT INTO soup_names (soupName) VALUES (?1)", [name])?;
            let table = format!("TABLE_{}", conn.last_insert_rowid());

            let columns: Vec<IndexColumn> = indexes
                .iter()
                .enumerate()
                .map(|(i, spec)| IndexColumn {
                    path: spec.path.clone(),
                    column: format!("{table}_{i}"),
                    index_type: spec.index_type,
                })
                .collect();

            let mut ddl = format!(
                "CREATE TABLE {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, soup TEXT NOT NULL, created INTEGER NOT NULL, lastModified INTEGER NOT NULL"
            );
            for col in &columns {
                ddl.push_str(&format!(", {} {}", col.column, col.index_type.sql_type()));
            }
            ddl.push_str(");");
            for col in &columns {
                ddl.push_str(&format!(
                    "\nCREATE INDEX {0}_idx ON {1} ({0});",
                    col.column, table
                ));
            }
            conn.execute_batch(&ddl)?;

            for col in &columns {
                conn.execute(
                    "INSERT INTO soup_index_map (soupName, path, columnName, columnType) VALUES (?1, ?2, ?3, ?4)",
                    params![name, col.path, col.column, col.index_type.as_str()],
                )?;
            }
            Ok(SoupLayout { table, columns })
        })?;

        debug!(soup = name, table = %layout.table, indexes = layout.columns.len(), "registered soup");
        self.soups.write().insert(name.to_string(), layout);
        Ok(())
    }

    fn has_soup(&self, name: &str) -> StoreResult<bool> {
        Ok(self.soups.read().contains_key(name))
    }

    fn drop_soup(&self, name: &str) -> StoreResult<()> {
        let layout = self.layout(name)?;
        self.in_transaction(|| -> StoreResult<()> {
            let conn = self.conn.lock();
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", layout.table))?;
            conn.execute("DELETE FROM soup_index_map WHERE soupName = ?1", [name])?;
            conn.execute("DELETE FROM soup_names WHERE soupName = ?1", [name])?;
            Ok(())
        })?;
        self.soups.write().remove(name);
        debug!(soup = name, "dropped soup");
        Ok(())
    }

    fn query(&self, query: &QuerySpec, page_index: usize) -> StoreResult<Vec<Vec<Value>>> {
        let limit = i64::try_from(query.page_size).unwrap_or(i64::MAX);
        let offset = i64::try_from(page_index.saturating_mul(query.page_size)).unwrap_or(i64::MAX);
        let sql = format!("{} LIMIT {} OFFSET {}", self.translate(query)?, limit, offset);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                values.push(to_json(row.get_ref(i)?, name == "soup")?);
            }
            result.push(values);
        }
        Ok(result)
    }

    fn count(&self, query: &QuerySpec) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM ({})", self.translate(query)?);
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn create(&self, soup: &str, record: Record) -> StoreResult<Record> {
        let layout = self.layout(soup)?;
        self.insert(&layout, record)
    }

    fn upsert(&self, soup: &str, record: Record, external_id_path: &str) -> StoreResult<Record> {
        let layout = self.layout(soup)?;
        let existing = if external_id_path == SOUP_ENTRY_ID {
            record.get(SOUP_ENTRY_ID).and_then(Value::as_i64)
        } else {
            match lookup_path(&record, external_id_path) {
                None | Some(Value::Null) => None,
                Some(value) => self.find_by_external_id(soup, &layout, external_id_path, value)?,
            }
        };

        match existing {
            Some(entry_id) => self.update(soup, &layout, entry_id, record),
            None => self.insert(&layout, record),
        }
    }

    fn retrieve(&self, soup: &str, entry_ids: &[i64]) -> StoreResult<Vec<Record>> {
        let layout = self.layout(soup)?;
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT soup FROM {} WHERE id IN ({}) ORDER BY id",
            layout.table,
            vec!["?"; entry_ids.len()].join(", ")
        ))?;
        let texts = stmt
            .query_map(params_from_iter(entry_ids.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        texts
            .iter()
            .map(|text| serde_json::from_str::<Record>(text).map_err(StoreError::from))
            .collect()
    }

    fn delete(&self, soup: &str, entry_ids: &[i64]) -> StoreResult<usize> {
        let layout = self.layout(soup)?;
        if entry_ids.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id IN ({})",
                layout.table,
                vec!["?"; entry_ids.len()].join(", ")
            ),
            params_from_iter(entry_ids.iter()),
        )?;
        debug!(soup, deleted, "deleted entries");
        Ok(deleted)
    }

    fn delete_by_query(&self, soup: &str, query: &QuerySpec) -> StoreResult<usize> {
        let layout = self.layout(soup)?;
        let selection = self.translate(query)?;

        let conn = self.conn.lock();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id IN ({})", layout.table, selection),
            [],
        )?;
        debug!(soup, deleted, "deleted entries by query");
        Ok(deleted)
    }

    fn in_transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce() -> Result<R, E>,
    {
        let conn = self.conn.lock();
        let savepoint = format!(
            "soupsync_sp_{}",
            self.next_savepoint.fetch_add(1, Ordering::Relaxed)
        );
        conn.execute_batch(&format!("SAVEPOINT {savepoint}"))
            .map_err(StoreError::from)?;

        match f() {
            Ok(value) => {
                conn.execute_batch(&format!("RELEASE {savepoint}"))
                    .map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) =
                    conn.execute_batch(&format!("ROLLBACK TO {savepoint}; RELEASE {savepoint}"))
                {
                    warn!(%savepoint, error = %rollback, "failed to roll back savepoint");
                }
                Err(err)
            }
        }
    }
}

fn load_layouts(conn: &Connection) -> StoreResult<HashMap<String, SoupLayout>> {
    let mut soups = HashMap::new();
    let mut names = conn.prepare("SELECT soupName, id FROM soup_names")?;
    let entries = names
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut index_map = conn.prepare(
        "SELECT path, columnName, columnType FROM soup_index_map WHERE soupName = ?1 ORDER BY rowid",
    )?;
    for (name, id) in entries {
        let rows = index_map
            .query_map([&name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = Vec::with_capacity(rows.len());
        for (path, column, column_type) in rows {
            columns.push(IndexColumn {
                path,
                column,
                index_type: IndexType::parse(&column_type)?,
            });
        }
        soups.insert(
            name,
            SoupLayout {
                table: format!("TABLE_{id}"),
                columns,
            },
        );
    }
    Ok(soups)
}

fn projections(layout: &SoupLayout, record: &Record) -> Vec<SqlValue> {
    layout
        .columns
        .iter()
        .map(|col| project(lookup_path(record, &col.path), col.index_type))
        .collect()
}

/// Projects a record value into an index column of the given type.
fn project(value: Option<&Value>, index_type: IndexType) -> SqlValue {
    let Some(value) = value else {
        return SqlValue::Null;
    };
    match (index_type, value) {
        (_, Value::Null) => SqlValue::Null,
        (_, Value::Bool(b)) => SqlValue::Text(b.to_string()),
        (IndexType::String, Value::String(s)) => SqlValue::Text(s.clone()),
        (IndexType::String, other) => SqlValue::Text(other.to_string()),
        (IndexType::Integer, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Null),
        (IndexType::Integer, Value::String(s)) => {
            s.parse::<i64>().map(SqlValue::Integer).unwrap_or(SqlValue::Null)
        }
        (IndexType::Floating, Value::Number(n)) => {
            n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null)
        }
        (IndexType::Floating, Value::String(s)) => {
            s.parse::<f64>().map(SqlValue::Real).unwrap_or(SqlValue::Null)
        }
        _ => SqlValue::Null,
    }
}

/// Converts a JSON scalar into the value `json_extract` would yield for it.
fn json_scalar(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json(value: ValueRef<'_>, whole_record: bool) -> StoreResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if whole_record {
                serde_json::from_str(&text)?
            } else {
                Value::String(text.into_owned())
            }
        }
        ValueRef::Blob(_) => {
            return Err(StoreError::invalid_query("blob columns are not supported"))
        }
    })
}
