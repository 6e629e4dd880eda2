//! Latest modification timestamp of a fetched batch.

use crate::config::TIMESTAMP_FORMAT;
use crate::record::children_of;
use crate::relationship::RelationshipSpec;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use soupsync_store::Record;
use tracing::warn;

/// The latest modification time seen in one or more batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    latest: Option<DateTime<Utc>>,
    skipped: usize,
}

impl Watermark {
    /// Latest timestamp, or `None` when no record carried a usable one.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.latest
    }

    /// Latest timestamp in epoch milliseconds.
    pub fn as_millis(&self) -> Option<i64> {
        self.latest.map(|t| t.timestamp_millis())
    }

    /// Returns true if no timestamp was found.
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    /// Number of records whose timestamp was missing or unparseable.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Folds in another batch's watermark.
    pub fn merge(&mut self, other: Watermark) {
        self.latest = self.latest.max(other.latest);
        self.skipped += other.skipped;
    }

    fn observe(&mut self, at: DateTime<Utc>) {
        self.latest = self.latest.max(Some(at));
    }
}

/// Computes the latest parent or child modification time in a batch.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkCalculator<'a> {
    spec: &'a RelationshipSpec,
}

impl<'a> WatermarkCalculator<'a> {
    /// Creates a calculator for `spec`.
    pub fn new(spec: &'a RelationshipSpec) -> Self {
        Self { spec }
    }

    /// Scans parents and their nested children.
    ///
    /// Each level is read with its own configured modification-date field.
    /// Records with a missing or malformed timestamp are skipped and logged.
    pub fn latest_modification_timestamp(&self, records: &[Value]) -> Watermark {
        let parent_field = self.spec.parent().modification_date_field();
        let children_field = self.spec.children().modification_date_field();
        let relationship = self.spec.children().sobject_type_plural();

        let mut watermark = Watermark::default();
        for value in records {
            let Some(record) = value.as_object() else {
                warn!("skipping fetched record that is not an object");
                watermark.skipped += 1;
                continue;
            };
            scan(record, parent_field, &mut watermark);

            match children_of(record, relationship) {
                Ok(children) => {
                    for child in children {
                        scan(child, children_field, &mut watermark);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping children of fetched record");
                    watermark.skipped += 1;
                }
            }
        }
        watermark
    }
}

fn scan(record: &Record, field: &str, watermark: &mut Watermark) {
    match record.get(field) {
        Some(Value::String(text)) => match parse_timestamp(text) {
            Some(at) => watermark.observe(at),
            None => {
                warn!(field, value = %text, "skipping malformed modification date");
                watermark.skipped += 1;
            }
        },
        Some(other) => {
            warn!(field, value = %other, "skipping malformed modification date");
            watermark.skipped += 1;
        }
        None => {
            warn!(field, "skipping record without modification date");
            watermark.skipped += 1;
        }
    }
}

/// Parses a remote timestamp.
///
/// Accepts the fixed `2020-01-01T00:00:00.000Z` form, RFC 3339, and numeric
/// offsets without a colon (`+0000`).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Formats a timestamp the way remote queries expect it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
