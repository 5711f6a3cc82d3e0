//! Table query description and its PostgREST rendering.
//!
//! DESIGN
//! ======
//! Data-access functions describe what they want as a [`SelectQuery`] /
//! [`Filter`] list; the REST adapter renders it to query-string pairs. Keeping
//! the rendering pure lets it be tested without a server and reused by the
//! browser client.

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;

/// Contiguous row window `offset..offset + limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;

    #[must_use]
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    #[must_use]
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self { offset: self.offset.saturating_add(self.limit), limit: self.limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(Self::DEFAULT_LIMIT)
    }
}

/// Row predicate. Only the operators the data layer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Eq { column: column.into(), value: value.to_string() }
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Self::In { column: column.into(), values: values.into_iter().map(|v| v.to_string()).collect() }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }

    /// PostgREST operator expression, e.g. `eq.42` or `in.(a,b)`.
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Self::Eq { value, .. } => format!("eq.{value}"),
            Self::In { values, .. } => {
                let joined = values.iter().map(|v| quote_list_value(v)).collect::<Vec<_>>().join(",");
                format!("in.({joined})")
            }
        }
    }

    #[must_use]
    pub fn to_pair(&self) -> (String, String) {
        (self.column().to_owned(), self.expression())
    }
}

/// Values inside `in.(...)` containing reserved characters must be quoted.
fn quote_list_value(value: &str) -> String {
    let reserved = |c: char| matches!(c, ',' | '(' | ')' | '"' | '\\' | ':' | '.') || c.is_whitespace();
    if value.is_empty() || value.chars().any(reserved) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_owned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    #[must_use]
    pub fn expression(&self) -> String {
        format!("{}.{}", self.column, if self.descending { "desc" } else { "asc" })
    }
}

/// A read against one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub page: Option<Page>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self { table: table.into(), columns: "*".to_owned(), filters: Vec::new(), order: None, page: None }
    }

    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Query-string pairs in a stable order: select, filters, order, window.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_owned(), self.columns.clone())];
        pairs.extend(self.filters.iter().map(Filter::to_pair));
        if let Some(order) = &self.order {
            pairs.push(("order".to_owned(), order.expression()));
        }
        if let Some(page) = self.page {
            pairs.push(("offset".to_owned(), page.offset.to_string()));
            pairs.push(("limit".to_owned(), page.limit.to_string()));
        }
        pairs
    }
}

/// Parse the total from a `Content-Range` header such as `0-9/57` or `*/0`.
#[must_use]
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}
