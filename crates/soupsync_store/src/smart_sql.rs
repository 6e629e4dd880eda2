//! Smart SQL translation.
//!
//! Rewrites `{soup}` and `{soup:path}` references into the table and column
//! names of a soup's physical layout. Text inside single-quoted literals is
//! left untouched.

use crate::error::{StoreError, StoreResult};
use crate::store::{IndexType, SOUP, SOUP_ENTRY_ID, SOUP_LAST_MODIFIED_DATE};
use std::collections::HashMap;

/// Physical layout of a registered soup.
#[derive(Debug, Clone)]
pub(crate) struct SoupLayout {
    /// Backing table.
    pub table: String,
    /// Index projections in registration order.
    pub columns: Vec<IndexColumn>,
}

/// One index projection column.
#[derive(Debug, Clone)]
pub(crate) struct IndexColumn {
    pub path: String,
    pub column: String,
    pub index_type: IndexType,
}

impl SoupLayout {
    /// Returns the projection column for a path, if the path is indexed.
    pub fn column_for(&self, path: &str) -> Option<&IndexColumn> {
        self.columns.iter().find(|c| c.path == path)
    }

    /// SQL expression for a field of this soup.
    ///
    /// JSON booleans read as `'true'` / `'false'` whether or not the path is
    /// indexed.
    pub fn field_expr(&self, path: &str) -> String {
        match path {
            SOUP => format!("{}.soup", self.table),
            SOUP_ENTRY_ID => format!("{}.id", self.table),
            SOUP_LAST_MODIFIED_DATE => format!("{}.lastModified", self.table),
            _ => match self.column_for(path) {
                Some(col) => format!("{}.{}", self.table, col.column),
                None => {
                    let json_path = format!("'$.{}'", path.replace('\'', "''"));
                    format!(
                        "CASE json_type({table}.soup, {json_path}) \
                         WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
                         ELSE json_extract({table}.soup, {json_path}) END",
                        table = self.table,
                    )
                }
            },
        }
    }
}

/// Translates smart SQL into SQL over the soups' tables.
pub(crate) fn translate(smart_sql: &str, soups: &HashMap<String, SoupLayout>) -> StoreResult<String> {
    let mut out = String::with_capacity(smart_sql.len() + 32);
    let mut chars = smart_sql.char_indices();
    let mut in_literal = false;

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '{' if !in_literal => {
                let rest = &smart_sql[pos + 1..];
                let end = rest.find('}').ok_or_else(|| {
                    StoreError::invalid_query(format!("unterminated reference at {pos}"))
                })?;
                out.push_str(&resolve(&rest[..end], soups)?);
                // Skip the reference body and the closing brace.
                for _ in 0..=rest[..end].chars().count() {
                    chars.next();
                }
            }
            _ => out.push(ch),
        }
    }

    if in_literal {
        return Err(StoreError::invalid_query("unterminated string literal"));
    }
    Ok(out)
}

fn resolve(reference: &str, soups: &HashMap<String, SoupLayout>) -> StoreResult<String> {
    let (soup, path) = match reference.split_once(':') {
        Some((soup, path)) => (soup.trim(), Some(path.trim())),
        None => (reference.trim(), None),
    };
    let layout = soups
        .get(soup)
        .ok_or_else(|| StoreError::soup_not_found(soup))?;

    match path {
        None => Ok(layout.table.clone()),
        Some("") => Err(StoreError::invalid_query(format!(
            "empty path in reference {{{reference}}}"
        ))),
        Some(path) => Ok(layout.field_expr(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn soups() -> HashMap<String, SoupLayout> {
        let mut soups = HashMap::new();
        soups.insert(
            "accounts".to_string(),
            SoupLayout {
                table: "TABLE_1".into(),
                columns: vec![
                    IndexColumn {
                        path: "Id".into(),
                        column: "TABLE_1_0".into(),
                        index_type: IndexType::String,
                    },
                    IndexColumn {
                        path: "__local__".into(),
                        column: "TABLE_1_1".into(),
                        index_type: IndexType::String,
                    },
                ],
            },
        );
        soups.insert(
            "contacts".to_string(),
            SoupLayout {
                table: "TABLE_2".into(),
                columns: vec![IndexColumn {
                    path: "AccountLocalId".into(),
                    column: "TABLE_2_0".into(),
                    index_type: IndexType::Integer,
                }],
            },
        );
        soups
    }

    #[test]
    fn translates_soup_and_indexed_fields() {
        let sql = translate(
            "SELECT {accounts:Id} FROM {accounts} WHERE {accounts:__local__} = 'true'",
            &soups(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT TABLE_1.TABLE_1_0 FROM TABLE_1 WHERE TABLE_1.TABLE_1_1 = 'true'"
        );
    }

    #[test]
    fn translates_reserved_paths() {
        let sql = translate(
            "SELECT {accounts:_soup}, {accounts:_soupEntryId}, {accounts:_soupLastModifiedDate} FROM {accounts}",
            &soups(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT TABLE_1.soup, TABLE_1.id, TABLE_1.lastModified FROM TABLE_1"
        );
    }

    #[test]
    fn unindexed_paths_use_json_extract() {
        let sql = translate("SELECT {contacts:Name} FROM {contacts}", &soups()).unwrap();
        assert_eq!(
            sql,
            "SELECT CASE json_type(TABLE_2.soup, '$.Name') WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' ELSE json_extract(TABLE_2.soup, '$.Name') END FROM TABLE_2"
        );
    }

    #[test]
    fn literals_are_left_alone() {
        let sql = translate(
            "SELECT {accounts:Id} FROM {accounts} WHERE {accounts:Id} = '{not a ref}'",
            &soups(),
        )
        .unwrap();
        assert!(sql.ends_with("= '{not a ref}'"));
    }

    #[test]
    fn unknown_soup_fails() {
        let err = translate("SELECT {ghosts:Id} FROM {ghosts}", &soups()).unwrap_err();
        assert!(matches!(err, StoreError::SoupNotFound { .. }));
    }

    #[test]
    fn unterminated_reference_fails() {
        assert!(translate("SELECT {accounts:Id FROM x", &soups()).is_err());
        assert!(translate("SELECT 'open FROM x", &soups()).is_err());
    }

    proptest! {
        #[test]
        fn text_without_references_is_unchanged(sql in "[a-zA-Z0-9 =,()*<>]{0,64}") {
            prop_assert_eq!(translate(&sql, &soups()).unwrap(), sql);
        }
    }
}
