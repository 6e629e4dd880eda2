//! Deleting local parents, cascading to children for master-detail.

use crate::error::{SyncError, SyncResult};
use crate::record::{id_string, local_id};
use crate::relationship::RelationshipSpec;
use crate::smart_query::{Expr, SmartSelect, Source};
use soupsync_store::{LocalStore, QuerySpec, Record, SOUP_ENTRY_ID};
use tracing::debug;

/// Deletes local parent records and, for master-detail, their children.
///
/// Lookup children are left in place with dangling parent links.
#[derive(Debug, Clone, Copy)]
pub struct CascadeDeleter<'a> {
    spec: &'a RelationshipSpec,
}

impl<'a> CascadeDeleter<'a> {
    /// Creates a deleter for `spec`.
    pub fn new(spec: &'a RelationshipSpec) -> Self {
        Self { spec }
    }

    /// Deletes one local parent record.
    ///
    /// The record is located by its local row id, or by its remote id when it
    /// was never saved locally. Returns the number of parents deleted.
    pub fn delete_from_local_store<S: LocalStore>(
        &self,
        store: &S,
        parent_soup: &str,
        record: &Record,
    ) -> SyncResult<usize> {
        let Some(entry_id) = local_id(record) else {
            let id_field = self.spec.parent().id_field();
            let id = record.get(id_field).and_then(id_string).ok_or_else(|| {
                SyncError::malformed(format!("record has neither {SOUP_ENTRY_ID} nor {id_field}"))
            })?;
            return self.delete_records_from_local_store(store, parent_soup, [id], id_field);
        };

        let children = self.spec.children();
        let cascade = self.spec.relationship_type().cascades();
        let deleted = store.in_transaction(|| -> SyncResult<usize> {
            if cascade {
                let orphans = SmartSelect::new(
                    vec![Expr::field(children.soup_name(), SOUP_ENTRY_ID)],
                    Source::Soup(children.soup_name().to_string()),
                )
                .filter(
                    Expr::field(children.soup_name(), children.parent_local_id_field())
                        .equals(Expr::Integer(entry_id)),
                );
                store.delete_by_query(
                    children.soup_name(),
                    &QuerySpec::smart(orphans.to_string(), 1),
                )?;
            }
            Ok(store.delete(parent_soup, &[entry_id])?)
        })?;

        debug!(soup = parent_soup, entry_id, deleted, cascade, "deleted parent");
        Ok(deleted)
    }

    /// Deletes the parents whose `id_field` is one of `ids`.
    ///
    /// Runs as a single transaction and returns the number of parents
    /// deleted. An id made only of digits also matches a numeric remote id.
    pub fn delete_records_from_local_store<S, I>(
        &self,
        store: &S,
        parent_soup: &str,
        ids: I,
        id_field: &str,
    ) -> SyncResult<usize>
    where
        S: LocalStore,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let ids: Vec<Expr> = ids
            .into_iter()
            .flat_map(|id| id_literals(id.as_ref()))
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let children = self.spec.children();
        let cascade = self.spec.relationship_type().cascades();
        let selected = Expr::field(parent_soup, id_field).in_list(ids);

        let deleted = store.in_transaction(|| -> SyncResult<usize> {
            if cascade {
                let orphans = SmartSelect::new(
                    vec![Expr::field(children.soup_name(), SOUP_ENTRY_ID)],
                    Source::Cross(vec![
                        children.soup_name().to_string(),
                        parent_soup.to_string(),
                    ]),
                )
                .filter(
                    Expr::field(children.soup_name(), children.parent_local_id_field())
                        .equals(Expr::field(parent_soup, SOUP_ENTRY_ID))
                        .and(selected.clone()),
                );
                store.delete_by_query(
                    children.soup_name(),
                    &QuerySpec::smart(orphans.to_string(), 1),
                )?;
            }

            let parents = SmartSelect::new(
                vec![Expr::field(parent_soup, SOUP_ENTRY_ID)],
                Source::Soup(parent_soup.to_string()),
            )
            .filter(selected.clone());
            Ok(store.delete_by_query(parent_soup, &QuerySpec::smart(parents.to_string(), 1))?)
        })?;

        debug!(soup = parent_soup, deleted, cascade, "deleted parents");
        Ok(deleted)
    }
}

/// Literals matching a remote id however it was stored.
///
/// Ids read back from the store are strings, but a numeric JSON id is stored
/// as a number, so canonical integers are matched both ways.
fn id_literals(id: &str) -> Vec<Expr> {
    let text = Expr::text(id);
    match id.parse::<i64>() {
        Ok(n) if n.to_string() == id => vec![text, Expr::Integer(n)],
        _ => vec![text],
    }
}
