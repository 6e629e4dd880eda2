//! Merging fetched parents and children into the local store.

use crate::config::{MergeMode, DEFAULT_PAGE_SIZE};
use crate::dirty::DirtyTracker;
use crate::error::{SyncError, SyncResult};
use crate::record::{id_string, local_id, mark_clean, take_children};
use crate::relationship::RelationshipSpec;
use serde_json::Value;
use soupsync_store::{LocalStore, Record};
use std::collections::BTreeSet;
use tracing::debug;

/// Counts from one merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Parents written.
    pub parents: usize,
    /// Children written.
    pub children: usize,
    /// Parents left alone because they were dirty locally.
    pub skipped: usize,
}

impl MergeStats {
    /// Adds another call's counts.
    pub fn accumulate(&mut self, other: MergeStats) {
        self.parents += other.parents;
        self.children += other.children;
        self.skipped += other.skipped;
    }
}

/// Writes fetched hierarchical records into the parent and children soups.
///
/// Each top-level record is written in its own transaction together with
/// its children, so a failing child leaves its parent untouched.
#[derive(Debug, Clone, Copy)]
pub struct LocalMerger<'a> {
    spec: &'a RelationshipSpec,
    merge_mode: MergeMode,
    page_size: usize,
}

impl<'a> LocalMerger<'a> {
    /// Creates a merger for `spec` that overwrites local records.
    pub fn new(spec: &'a RelationshipSpec) -> Self {
        Self {
            spec,
            merge_mode: MergeMode::Overwrite,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the merge mode.
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Sets the page size used when looking up dirty parents.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Saves `records` into `parent_soup` and the children soup.
    ///
    /// Every written parent and child ends up with all sync flags false, and
    /// every child is linked to its parent by remote id and local row id.
    ///
    /// # Errors
    ///
    /// Fails on the first record that is not an object, lacks a parent id,
    /// or cannot be written. Records merged before it stay merged.
    pub fn save_records_to_local_store<S: LocalStore>(
        &self,
        store: &S,
        parent_soup: &str,
        records: &[Value],
    ) -> SyncResult<MergeStats> {
        let id_field = self.spec.parent().id_field();
        let leave_alone = match self.merge_mode {
            MergeMode::Overwrite => BTreeSet::new(),
            MergeMode::LeaveIfChanged => DirtyTracker::new(self.spec)
                .with_page_size(self.page_size)
                .get_dirty_ids(store, parent_soup, id_field)?,
        };

        let mut stats = MergeStats::default();
        for value in records {
            let record = value
                .as_object()
                .ok_or_else(|| SyncError::malformed("fetched record is not an object"))?;
            let parent_id = record
                .get(id_field)
                .and_then(id_string)
                .ok_or_else(|| SyncError::malformed(format!("fetched parent has no {id_field}")))?;

            if leave_alone.contains(&parent_id) {
                debug!(id = %parent_id, "leaving locally changed parent");
                stats.skipped += 1;
                continue;
            }

            let children = store.in_transaction(|| -> SyncResult<usize> {
                self.save_one(store, parent_soup, record.clone(), &parent_id)
            })?;
            stats.parents += 1;
            stats.children += children;
        }

        debug!(
            soup = parent_soup,
            parents = stats.parents,
            children = stats.children,
            skipped = stats.skipped,
            "merged fetched records"
        );
        Ok(stats)
    }

    fn save_one<S: LocalStore>(
        &self,
        store: &S,
        parent_soup: &str,
        mut parent: Record,
        parent_id: &str,
    ) -> SyncResult<usize> {
        let parent_info = self.spec.parent();
        let children_info = self.spec.children();

        let children = take_children(&mut parent, children_info.sobject_type_plural())?;
        mark_clean(&mut parent);
        let saved = store.upsert(parent_soup, parent, parent_info.id_field())?;
        let parent_local_id = local_id(&saved).ok_or_else(|| {
            SyncError::malformed(format!("saved parent {parent_id} has no local id"))
        })?;

        let count = children.len();
        for mut child in children {
            child.insert(
                children_info.parent_id_field().to_string(),
                Value::from(parent_id),
            );
            child.insert(
                children_info.parent_local_id_field().to_string(),
                Value::from(parent_local_id),
            );
            mark_clean(&mut child);
            store.upsert(children_info.soup_name(), child, children_info.id_field())?;
        }
        Ok(count)
    }
}
