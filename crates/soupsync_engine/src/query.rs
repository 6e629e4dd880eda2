//! Remote fetch and id-only queries for a relationship.

use crate::relationship::RelationshipSpec;
use crate::soql::SoqlBuilder;
use crate::watermark::format_timestamp;
use chrono::{DateTime, Utc};

/// Builds remote queries for a [`RelationshipSpec`].
///
/// Parents are selected with their children nested as a sub-query over the
/// children relationship name.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    spec: &'a RelationshipSpec,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a query builder for `spec`.
    pub fn new(spec: &'a RelationshipSpec) -> Self {
        Self { spec }
    }

    /// Query fetching parents with their children.
    ///
    /// Id and modification-date fields are appended to each field list
    /// unless already listed.
    pub fn build_fetch_query(&self) -> String {
        self.build_fetch_query_since(None)
    }

    /// Query fetching parents and children modified after `since`.
    ///
    /// `None` yields the same text as [`QueryBuilder::build_fetch_query`].
    pub fn build_fetch_query_since(&self, since: Option<DateTime<Utc>>) -> String {
        let parent = self.spec.parent();
        let children = self.spec.children();

        let mut parent_fields = with_required(
            self.spec.parent_fields(),
            &[parent.id_field(), parent.modification_date_field()],
        );
        let children_fields = with_required(
            self.spec.children_fields(),
            &[children.id_field(), children.modification_date_field()],
        );

        let (parent_filter, children_filter) = match since {
            Some(since) => {
                let stamp = format_timestamp(since);
                let parent_since = format!("{} > {stamp}", parent.modification_date_field());
                let parent_filter = match self.spec.parent_filter() {
                    "" => parent_since,
                    filter => format!("{parent_since} and ({filter})"),
                };
                let children_since =
                    format!("{} > {stamp}", children.modification_date_field());
                (parent_filter, children_since)
            }
            None => (self.spec.parent_filter().to_string(), String::new()),
        };

        parent_fields.push(
            SoqlBuilder::with_fields(children_fields)
                .from(children.sobject_type_plural())
                .filter(children_filter)
                .build_nested(),
        );

        SoqlBuilder::with_fields(parent_fields)
            .from(parent.sobject_type())
            .filter(parent_filter)
            .build()
    }

    /// Query returning only parent and child ids, used to find remote deletions.
    pub fn build_id_only_query(&self) -> String {
        let parent = self.spec.parent();
        let children = self.spec.children();

        let nested = SoqlBuilder::with_fields([children.id_field()])
            .from(children.sobject_type_plural())
            .build_nested();

        SoqlBuilder::with_fields([parent.id_field().to_string(), nested])
            .from(parent.sobject_type())
            .filter(self.spec.parent_filter())
            .build()
    }
}

fn with_required(fields: &[String], required: &[&str]) -> Vec<String> {
    let mut out = fields.to_vec();
    for field in required {
        if !out.iter().any(|f| f == field) {
            out.push((*field).to_string());
        }
    }
    out
}
