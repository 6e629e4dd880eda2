//! Configuration for the sync engine.

/// Sync-metadata field: the record differs from the server.
pub const LOCAL: &str = "__local__";
/// Sync-metadata field: the record was created locally.
pub const LOCALLY_CREATED: &str = "__locally_created__";
/// Sync-metadata field: the record was updated locally.
pub const LOCALLY_UPDATED: &str = "__locally_updated__";
/// Sync-metadata field: the record was deleted locally.
pub const LOCALLY_DELETED: &str = "__locally_deleted__";

/// All sync-metadata fields, in the order they are stamped.
pub const SYNC_FLAGS: [&str; 4] = [LOCAL, LOCALLY_CREATED, LOCALLY_UPDATED, LOCALLY_DELETED];

/// Default remote id field.
pub const DEFAULT_ID_FIELD: &str = "Id";
/// Default remote modification-date field.
pub const DEFAULT_MODIFICATION_DATE_FIELD: &str = "LastModifiedDate";

/// Format of remote modification timestamps (UTC, millisecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default number of rows fetched per local query page.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// How fetched records are merged over local ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Fetched records replace local ones, dirty or not.
    #[default]
    Overwrite,
    /// Parents that are dirty locally (with their children) are left as they are.
    LeaveIfChanged,
}

/// Options for a sync-down pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Rows per page when paging through local queries.
    pub page_size: usize,
    /// Merge behaviour for fetched records.
    pub merge_mode: MergeMode,
}

impl SyncOptions {
    /// Creates options with the default page size and merge mode.
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            merge_mode: MergeMode::default(),
        }
    }

    /// Sets the local query page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the merge mode.
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new()
    }
}
