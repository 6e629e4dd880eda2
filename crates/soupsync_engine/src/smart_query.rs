//! Composable smart-SQL fragments.
//!
//! Local queries are assembled from typed fragments and rendered once, so
//! soup references, literals and grouping are written in a single place.

use std::fmt;

/// A value expression in a smart query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A field of a soup: `{soup:path}`.
    Field {
        /// Soup name.
        soup: String,
        /// Field path.
        path: String,
    },
    /// A quoted text literal.
    Text(String),
    /// An integer literal.
    Integer(i64),
}

impl Expr {
    /// `{soup:path}`.
    pub fn field(soup: impl Into<String>, path: impl Into<String>) -> Self {
        Expr::Field {
            soup: soup.into(),
            path: path.into(),
        }
    }

    /// A text literal; single quotes are doubled when rendered.
    pub fn text(value: impl Into<String>) -> Self {
        Expr::Text(value.into())
    }

    /// `self = other`.
    pub fn equals(self, other: Expr) -> Predicate {
        Predicate::Eq(self, other)
    }

    /// `self IN (values...)`.
    pub fn in_list(self, values: Vec<Expr>) -> Predicate {
        Predicate::InList(self, values)
    }

    /// `self NOT IN (select)`.
    pub fn not_in(self, select: SmartSelect) -> Predicate {
        Predicate::NotIn(self, Box::new(select))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field { soup, path } => write!(f, "{{{soup}:{path}}}"),
            Expr::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
            Expr::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// A boolean condition in a smart query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `a = b`
    Eq(Expr, Expr),
    /// `a IN (b, c)`
    InList(Expr, Vec<Expr>),
    /// `a NOT IN (SELECT ...)`
    NotIn(Expr, Box<SmartSelect>),
    /// Conjunction, rendered without grouping.
    And(Vec<Predicate>),
    /// Disjunction, always rendered in parentheses.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut terms = match self {
            Predicate::And(terms) => terms,
            single => vec![single],
        };
        terms.push(other);
        Predicate::And(terms)
    }

    /// `(self OR other)`, flattening nested disjunctions.
    pub fn or(self, other: Predicate) -> Predicate {
        let mut terms = match self {
            Predicate::Or(terms) => terms,
            single => vec![single],
        };
        terms.push(other);
        Predicate::Or(terms)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(left, right) => write!(f, "{left} = {right}"),
            Predicate::InList(expr, values) => {
                write!(f, "{expr} IN (")?;
                write_joined(f, values, ", ")?;
                f.write_str(")")
            }
            Predicate::NotIn(expr, select) => write!(f, "{expr} NOT IN ({select})"),
            Predicate::And(terms) => write_joined(f, terms, " AND "),
            Predicate::Or(terms) => {
                f.write_str("(")?;
                write_joined(f, terms, " OR ")?;
                f.write_str(")")
            }
        }
    }
}

/// The `FROM` clause of a smart query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A single soup: `{soup}`.
    Soup(String),
    /// An implicit cross join: `{a},{b}`.
    Cross(Vec<String>),
    /// `{left} LEFT OUTER JOIN {right} ON condition`.
    LeftJoin {
        /// Soup kept even without matches.
        left: String,
        /// Joined soup.
        right: String,
        /// Join condition.
        on: Predicate,
    },
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Soup(soup) => write!(f, "{{{soup}}}"),
            Source::Cross(soups) => {
                for (i, soup) in soups.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{{{soup}}}")?;
                }
                Ok(())
            }
            Source::LeftJoin { left, right, on } => {
                write!(f, "{{{left}}} LEFT OUTER JOIN {{{right}}} ON {on}")
            }
        }
    }
}

/// A `SELECT` statement over soups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSelect {
    distinct: bool,
    columns: Vec<Expr>,
    source: Source,
    filter: Option<Predicate>,
    order_by: Option<Expr>,
}

impl SmartSelect {
    /// `SELECT columns FROM source`.
    pub fn new(columns: Vec<Expr>, source: Source) -> Self {
        Self {
            distinct: false,
            columns,
            source,
            filter: None,
            order_by: None,
        }
    }

    /// Makes this a `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sets the `WHERE` condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Sorts rows by `expr`, ascending.
    pub fn order_by(mut self, expr: Expr) -> Self {
        self.order_by = Some(expr);
        self
    }
}

impl fmt::Display for SmartSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        })?;
        write_joined(f, &self.columns, ", ")?;
        write!(f, " FROM {}", self.source)?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {filter}")?;
        }
        if let Some(order_by) = &self.order_by {
            write!(f, " ORDER BY {order_by}")?;
        }
        Ok(())
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
