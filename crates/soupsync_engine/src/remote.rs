//! Remote data source abstraction.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// One page of remote query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotePage {
    /// Records in this page.
    pub records: Vec<Value>,
    /// Total number of records the query matched.
    pub total_size: usize,
    /// Continuation token for the next page, if any.
    pub next: Option<String>,
}

/// A remote source that runs queries and pages through their results.
///
/// This trait abstracts transport and authentication, allowing different
/// implementations (REST, a scripted double for tests, etc.). Failures are
/// reported with [`SyncError::Remote`]; callers decide whether to retry.
pub trait RemoteSource: Send + Sync {
    /// Runs a query and returns its first page.
    fn fetch(&self, query: &str) -> SyncResult<RemotePage>;

    /// Returns the page a continuation token points to.
    fn fetch_more(&self, continuation: &str) -> SyncResult<RemotePage>;
}

/// A remote source that answers from scripted pages.
#[derive(Debug, Default)]
pub struct ScriptedRemoteSource {
    state: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    first_pages: HashMap<String, String>,
    pages: HashMap<String, RemotePage>,
    next_cursor: usize,
    issued: Vec<String>,
    failure: Option<(String, bool)>,
}

impl ScriptState {
    fn cursor(&mut self) -> String {
        self.next_cursor += 1;
        format!("cursor-{}", self.next_cursor)
    }

    fn page(&self, cursor: &str) -> SyncResult<RemotePage> {
        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| SyncError::remote_fatal(format!("unknown continuation: {cursor}")))
    }

    fn take_failure(&mut self) -> SyncResult<()> {
        match self.failure.take() {
            Some((message, true)) => Err(SyncError::remote_retryable(message)),
            Some((message, false)) => Err(SyncError::remote_fatal(message)),
            None => Ok(()),
        }
    }
}

impl ScriptedRemoteSource {
    /// Creates a source with no scripted queries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the pages returned for `query`, replacing earlier ones.
    ///
    /// An empty `pages` scripts a single empty page.
    pub fn respond(&self, query: impl Into<String>, pages: Vec<Vec<Value>>) {
        let mut state = self.state.lock();
        let total_size = pages.iter().map(Vec::len).sum();
        let pages = if pages.is_empty() { vec![Vec::new()] } else { pages };

        let cursors: Vec<String> = pages.iter().map(|_| state.cursor()).collect();
        for (i, records) in pages.into_iter().enumerate() {
            let page = RemotePage {
                records,
                total_size,
                next: cursors.get(i + 1).cloned(),
            };
            state.pages.insert(cursors[i].clone(), page);
        }
        state.first_pages.insert(query.into(), cursors[0].clone());
    }

    /// Makes the next call fail.
    pub fn fail_next(&self, message: impl Into<String>, retryable: bool) {
        self.state.lock().failure = Some((message.into(), retryable));
    }

    /// Queries passed to [`RemoteSource::fetch`], in call order.
    pub fn issued_queries(&self) -> Vec<String> {
        self.state.lock().issued.clone()
    }
}

impl RemoteSource for ScriptedRemoteSource {
    fn fetch(&self, query: &str) -> SyncResult<RemotePage> {
        let mut state = self.state.lock();
        state.issued.push(query.to_string());
        state.take_failure()?;
        let cursor = state
            .first_pages
            .get(query)
            .cloned()
            .ok_or_else(|| SyncError::remote_fatal(format!("no scripted response for: {query}")))?;
        state.page(&cursor)
    }

    fn fetch_more(&self, continuation: &str) -> SyncResult<RemotePage> {
        let mut state = self.state.lock();
        state.take_failure()?;
        state.page(continuation)
    }
}
