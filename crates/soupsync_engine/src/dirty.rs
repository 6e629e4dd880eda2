//! Dirty-parent detection.
//!
//! A parent is dirty when its own `__local__` flag is set or when any child
//! linked to it by local row id has its flag set. Children are joined with a
//! left outer join so that childless parents are classified by their own
//! flag alone.

use crate::config::{DEFAULT_PAGE_SIZE, LOCAL};
use crate::error::SyncResult;
use crate::record::id_string;
use crate::relationship::RelationshipSpec;
use crate::smart_query::{Expr, Predicate, SmartSelect, Source};
use soupsync_store::{LocalStore, QuerySpec, SOUP_ENTRY_ID};
use std::collections::BTreeSet;
use tracing::debug;

/// Classifies local parents of a relationship as dirty or clean.
#[derive(Debug, Clone, Copy)]
pub struct DirtyTracker<'a> {
    spec: &'a RelationshipSpec,
    page_size: usize,
}

impl<'a> DirtyTracker<'a> {
    /// Creates a tracker for `spec`.
    pub fn new(spec: &'a RelationshipSpec) -> Self {
        Self {
            spec,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the number of rows read per query page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Smart query selecting `id_field` of every dirty parent in `parent_soup`.
    pub fn build_dirty_ids_query(&self, parent_soup: &str, id_field: &str) -> String {
        self.dirty_ids_select(parent_soup, id_field).to_string()
    }

    /// Smart query selecting `id_field` of every clean parent in `parent_soup`.
    pub fn build_non_dirty_ids_query(&self, parent_soup: &str, id_field: &str) -> String {
        self.non_dirty_ids_select(parent_soup, id_field).to_string()
    }

    /// Ids of dirty parents, in lexical order.
    pub fn get_dirty_ids<S: LocalStore>(
        &self,
        store: &S,
        parent_soup: &str,
        id_field: &str,
    ) -> SyncResult<BTreeSet<String>> {
        let select = self.dirty_ids_select(parent_soup, id_field);
        let ids = self.collect_ids(store, select, Expr::field(parent_soup, id_field))?;
        debug!(soup = parent_soup, count = ids.len(), "collected dirty parent ids");
        Ok(ids)
    }

    /// Ids of clean parents, in lexical order.
    pub fn get_non_dirty_ids<S: LocalStore>(
        &self,
        store: &S,
        parent_soup: &str,
        id_field: &str,
    ) -> SyncResult<BTreeSet<String>> {
        let select = self.non_dirty_ids_select(parent_soup, id_field);
        let ids = self.collect_ids(store, select, Expr::field(parent_soup, id_field))?;
        debug!(soup = parent_soup, count = ids.len(), "collected non-dirty parent ids");
        Ok(ids)
    }

    fn dirty_ids_select(&self, parent_soup: &str, id_field: &str) -> SmartSelect {
        self.dirty_parents(parent_soup, Expr::field(parent_soup, id_field))
    }

    fn non_dirty_ids_select(&self, parent_soup: &str, id_field: &str) -> SmartSelect {
        let dirty = self.dirty_parents(parent_soup, Expr::field(parent_soup, SOUP_ENTRY_ID));
        SmartSelect::new(
            vec![Expr::field(parent_soup, id_field)],
            Source::Soup(parent_soup.to_string()),
        )
        .filter(Expr::field(parent_soup, SOUP_ENTRY_ID).not_in(dirty))
    }

    fn dirty_parents(&self, parent_soup: &str, column: Expr) -> SmartSelect {
        let children = self.spec.children();
        let children_soup = children.soup_name();

        let join = Source::LeftJoin {
            left: parent_soup.to_string(),
            right: children_soup.to_string(),
            on: Expr::field(children_soup, children.parent_local_id_field())
                .equals(Expr::field(parent_soup, SOUP_ENTRY_ID)),
        };
        let dirty = local_flag_set(parent_soup).or(local_flag_set(children_soup));

        SmartSelect::new(vec![column], join).distinct().filter(dirty)
    }

    /// Reads every page of `select`, sorted on `sort_key` so pages line up.
    fn collect_ids<S: LocalStore>(
        &self,
        store: &S,
        select: SmartSelect,
        sort_key: Expr,
    ) -> SyncResult<BTreeSet<String>> {
        let query = QuerySpec::smart(select.order_by(sort_key).to_string(), self.page_size);
        let mut ids = BTreeSet::new();
        let mut page_index = 0;
        loop {
            let rows = store.query(&query, page_index)?;
            let full_page = rows.len() == self.page_size;
            ids.extend(
                rows.iter()
                    .filter_map(|row| row.first())
                    .filter_map(id_string),
            );
            if !full_page {
                return Ok(ids);
            }
            page_index += 1;
        }
    }
}

fn local_flag_set(soup: &str) -> Predicate {
    Expr::field(soup, LOCAL).equals(Expr::text("true"))
}
