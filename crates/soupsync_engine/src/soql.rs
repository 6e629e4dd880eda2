//! Remote query text builder.

/// Builds `select ... from ... [where ...]` query text.
#[derive(Debug, Clone, Default)]
pub struct SoqlBuilder {
    fields: Vec<String>,
    from: String,
    predicate: Option<String>,
}

impl SoqlBuilder {
    /// Starts a query selecting `fields` in order.
    pub fn with_fields<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the queried entity or relationship.
    pub fn from(mut self, entity: impl Into<String>) -> Self {
        self.from = entity.into();
        self
    }

    /// Sets the `where` predicate. An empty predicate means none.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        self.predicate = (!predicate.is_empty()).then_some(predicate);
        self
    }

    /// Renders the query.
    pub fn build(&self) -> String {
        let mut soql = format!("select {} from {}", self.fields.join(", "), self.from);
        if let Some(predicate) = &self.predicate {
            soql.push_str(" where ");
            soql.push_str(predicate);
        }
        soql
    }

    /// Renders the query as a parenthesized sub-query.
    pub fn build_nested(&self) -> String {
        format!("({})", self.build())
    }
}
