//! Query-string builder for the backend's table endpoints.
//!
//! Filters use the `column=op.value` grammar, e.g. `user_id=eq.<uuid>`.

use std::fmt::Display;

/// Accumulated query-string parameters for one table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    params: Vec<(String, String)>,
}

impl TableQuery {
    /// Start a query projecting `columns`.
    #[must_use]
    pub fn select(columns: &str) -> Self {
        Self::default().param("select", columns)
    }

    /// Start a query with no projection (for updates and deletes).
    #[must_use]
    pub fn filter() -> Self {
        Self::default()
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// Case-insensitive substring match on any of `columns`.
    #[must_use]
    pub fn any_ilike(self, columns: &[&str], term: &str) -> Self {
        let pattern = quote(&format!("*{term}*"));
        let clauses = columns
            .iter()
            .map(|column| format!("{column}.ilike.{pattern}"))
            .collect::<Vec<_>>()
            .join(",");
        self.param("or", format!("({clauses})"))
    }

    /// Newest (largest) first.
    #[must_use]
    pub fn order_desc(self, column: &str) -> Self {
        self.param("order", format!("{column}.desc"))
    }

    #[must_use]
    pub fn order_asc(self, column: &str) -> Self {
        self.param("order", format!("{column}.asc"))
    }

    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.param("limit", limit.to_string())
    }

    /// Conflict target for an upsert.
    #[must_use]
    pub fn on_conflict(self, columns: &str) -> Self {
        self.param("on_conflict", columns)
    }

    /// Parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_owned(), value.into()));
        self
    }
}

/// Double-quote a filter value so commas, dots and parentheses in user
/// input are not read as filter syntax.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
