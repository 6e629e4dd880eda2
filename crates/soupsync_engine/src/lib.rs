//! # Soupsync Engine
//!
//! Parent/children sync reconciliation for soupsync.
//!
//! This crate provides:
//! - Relationship definitions (parent, children, master-detail or lookup)
//! - Remote fetch, incremental and id-only query generation
//! - Dirty-parent detection over the local soups
//! - Merging fetched hierarchies into the local store
//! - Cascade deletes driven by the relationship type
//! - Watermark computation for incremental resumption
//! - A remote source abstraction with a scripted implementation
//!
//! ## Architecture
//!
//! An orchestration layer drives one [`ParentChildrenTarget`] per sync
//! definition:
//! 1. Build a fetch query and run it against a [`RemoteSource`]
//! 2. Merge the returned parents and nested children locally
//! 3. Persist the batch [`Watermark`] as the lower bound of the next fetch
//! 4. Remove local parents the remote source no longer returns
//!
//! ## Key Invariants
//!
//! - Merged parents and children have every sync flag set to false
//! - A parent is dirty if it or any of its children is dirty
//! - Childless clean parents are never dirty
//! - Master-detail deletes take the children along; lookup deletes do not
//! - Each merged parent is written atomically with its children
//! - The engine never retries; failures propagate to the caller

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cascade;
mod config;
mod dirty;
mod error;
mod merge;
mod query;
mod record;
mod relationship;
mod remote;
mod smart_query;
mod soql;
mod target;
mod watermark;

pub use cascade::CascadeDeleter;
pub use config::{
    MergeMode, SyncOptions, DEFAULT_ID_FIELD, DEFAULT_MODIFICATION_DATE_FIELD, DEFAULT_PAGE_SIZE,
    LOCAL, LOCALLY_CREATED, LOCALLY_DELETED, LOCALLY_UPDATED, SYNC_FLAGS, TIMESTAMP_FORMAT,
};
pub use dirty::DirtyTracker;
pub use error::{SyncError, SyncResult};
pub use merge::{LocalMerger, MergeStats};
pub use query::QueryBuilder;
pub use record::{children_of, id_string, is_locally_dirty, local_id, mark_clean};
pub use relationship::{ChildrenInfo, ParentInfo, RelationshipSpec, RelationshipType};
pub use remote::{RemotePage, RemoteSource, ScriptedRemoteSource};
pub use smart_query::{Expr, Predicate, SmartSelect, Source};
pub use soql::SoqlBuilder;
pub use target::{ParentChildrenTarget, SyncDownOutcome};
pub use watermark::{format_timestamp, parse_timestamp, Watermark, WatermarkCalculator};
