//! Parent/children sync target.
//!
//! [`ParentChildrenTarget`] holds one [`RelationshipSpec`] and exposes every
//! reconciliation operation over it, so an orchestration layer keeps a
//! single value per sync definition.

use crate::cascade::CascadeDeleter;
use crate::config::SyncOptions;
use crate::dirty::DirtyTracker;
use crate::error::{SyncError, SyncResult};
use crate::merge::{LocalMerger, MergeStats};
use crate::query::QueryBuilder;
use crate::record::id_string;
use crate::relationship::RelationshipSpec;
use crate::remote::{RemotePage, RemoteSource};
use crate::watermark::{Watermark, WatermarkCalculator};
use chrono::{DateTime, Utc};
use serde_json::Value;
use soupsync_store::{LocalStore, Record};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Result of a sync-down pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDownOutcome {
    /// Top-level records received from the remote source.
    pub fetched: usize,
    /// Counts from merging them.
    pub merge: MergeStats,
    /// Latest modification time seen; persist it for the next pass.
    pub watermark: Watermark,
}

/// A parent/children sync definition and its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentChildrenTarget {
    spec: RelationshipSpec,
}

impl ParentChildrenTarget {
    /// Creates a target for `spec`.
    pub fn new(spec: RelationshipSpec) -> Self {
        Self { spec }
    }

    /// Always fails; see [`RelationshipSpec::from_query`].
    pub fn from_query(query: &str) -> SyncResult<Self> {
        RelationshipSpec::from_query(query).map(Self::new)
    }

    /// Restores a target persisted with [`ParentChildrenTarget::to_json`].
    pub fn from_json(json: &str) -> SyncResult<Self> {
        RelationshipSpec::from_json(json).map(Self::new)
    }

    /// Serializes the target's definition.
    pub fn to_json(&self) -> SyncResult<String> {
        self.spec.to_json()
    }

    /// The relationship definition.
    pub fn spec(&self) -> &RelationshipSpec {
        &self.spec
    }

    /// The parent soup named by the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the definition names no parent soup.
    pub fn parent_soup(&self) -> SyncResult<&str> {
        self.spec.parent().soup_name().ok_or_else(|| {
            SyncError::config(format!(
                "no parent soup configured for {}",
                self.spec.parent().sobject_type()
            ))
        })
    }

    /// Remote query builder.
    pub fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.spec)
    }

    /// Dirty-parent tracker.
    pub fn dirty_tracker(&self) -> DirtyTracker<'_> {
        DirtyTracker::new(&self.spec)
    }

    /// Local merger.
    pub fn merger(&self) -> LocalMerger<'_> {
        LocalMerger::new(&self.spec)
    }

    /// Cascade deleter.
    pub fn deleter(&self) -> CascadeDeleter<'_> {
        CascadeDeleter::new(&self.spec)
    }

    /// Watermark calculator.
    pub fn watermarks(&self) -> WatermarkCalculator<'_> {
        WatermarkCalculator::new(&self.spec)
    }

    /// Query fetching every parent with its children.
    pub fn fetch_query(&self) -> String {
        self.queries().build_fetch_query()
    }

    /// Query fetching only parent and child ids.
    pub fn id_only_query(&self) -> String {
        self.queries().build_id_only_query()
    }

    /// Ids of locally dirty parents in the parent soup.
    pub fn dirty_ids<S: LocalStore>(&self, store: &S) -> SyncResult<BTreeSet<String>> {
        self.dirty_tracker()
            .get_dirty_ids(store, self.parent_soup()?, self.spec.parent().id_field())
    }

    /// Ids of clean parents in the parent soup.
    pub fn non_dirty_ids<S: LocalStore>(&self, store: &S) -> SyncResult<BTreeSet<String>> {
        self.dirty_tracker()
            .get_non_dirty_ids(store, self.parent_soup()?, self.spec.parent().id_field())
    }

    /// Merges fetched records into the parent and children soups.
    pub fn save_records<S: LocalStore>(
        &self,
        store: &S,
        records: &[Value],
        options: &SyncOptions,
    ) -> SyncResult<MergeStats> {
        self.merger()
            .with_merge_mode(options.merge_mode)
            .with_page_size(options.page_size)
            .save_records_to_local_store(store, self.parent_soup()?, records)
    }

    /// Deletes one parent, cascading per relationship type.
    pub fn delete_record<S: LocalStore>(&self, store: &S, record: &Record) -> SyncResult<usize> {
        self.deleter()
            .delete_from_local_store(store, self.parent_soup()?, record)
    }

    /// Deletes parents by remote id, cascading per relationship type.
    ///
    /// Returns the number of parents actually removed.
    pub fn delete_records<S, I>(&self, store: &S, ids: I) -> SyncResult<usize>
    where
        S: LocalStore,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.deleter().delete_records_from_local_store(
            store,
            self.parent_soup()?,
            ids,
            self.spec.parent().id_field(),
        )
    }

    /// Latest parent or child modification time in a batch.
    pub fn latest_modification_timestamp(&self, records: &[Value]) -> Watermark {
        self.watermarks().latest_modification_timestamp(records)
    }

    /// Fetches parents and children modified after `since` and merges them.
    ///
    /// Remote pages are drained in order; each page is merged before the
    /// next one is requested.
    pub fn sync_down<S, R>(
        &self,
        store: &S,
        remote: &R,
        since: Option<DateTime<Utc>>,
        options: &SyncOptions,
    ) -> SyncResult<SyncDownOutcome>
    where
        S: LocalStore,
        R: RemoteSource + ?Sized,
    {
        let query = self.queries().build_fetch_query_since(since);
        debug!(%query, "syncing down");

        let mut outcome = SyncDownOutcome::default();
        drain(remote, &query, |page| {
            outcome.fetched += page.records.len();
            outcome
                .watermark
                .merge(self.latest_modification_timestamp(&page.records));
            outcome
                .merge
                .accumulate(self.save_records(store, &page.records, options)?);
            Ok(())
        })?;

        info!(
            parent = self.spec.parent().sobject_type(),
            fetched = outcome.fetched,
            merged = outcome.merge.parents,
            skipped = outcome.merge.skipped,
            watermark = ?outcome.watermark.as_millis(),
            "sync down complete"
        );
        Ok(outcome)
    }

    /// Deletes clean local parents that no longer exist remotely.
    ///
    /// Dirty parents are kept. Returns the number of parents removed.
    pub fn clean_ghosts<S, R>(&self, store: &S, remote: &R, options: &SyncOptions) -> SyncResult<usize>
    where
        S: LocalStore,
        R: RemoteSource + ?Sized,
    {
        let id_field = self.spec.parent().id_field();
        let mut local_ids = self
            .dirty_tracker()
            .with_page_size(options.page_size)
            .get_non_dirty_ids(store, self.parent_soup()?, id_field)?;

        drain(remote, &self.id_only_query(), |page| {
            for record in &page.records {
                if let Some(id) = record.get(id_field).and_then(id_string) {
                    local_ids.remove(&id);
                }
            }
            Ok(())
        })?;

        let ghosts = local_ids.len();
        let removed = self.delete_records(store, &local_ids)?;
        info!(
            parent = self.spec.parent().sobject_type(),
            ghosts,
            removed,
            "cleaned ghost records"
        );
        Ok(removed)
    }
}

fn drain<R, F>(remote: &R, query: &str, mut on_page: F) -> SyncResult<()>
where
    R: RemoteSource + ?Sized,
    F: FnMut(&RemotePage) -> SyncResult<()>,
{
    let mut page = remote.fetch(query)?;
    loop {
        on_page(&page)?;
        match page.next.take() {
            Some(continuation) => page = remote.fetch_more(&continuation)?,
            None => return Ok(()),
        }
    }
}
