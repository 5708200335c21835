//! Bound-parameter WHERE clauses.
//!
//! Column names come only from `&'static str` literals in this crate; every
//! caller-supplied value travels as a bound parameter.

use relledger_schema::{Flag, ListQuery, TriState};
use rusqlite::types::Value as SqlValue;

/// An AND-combined list of active predicates and their bound values.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `column = ?` when a value is present.
    pub(crate) fn eq(mut self, column: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.clauses.push(format!("{column} = ?"));
            self.params.push(SqlValue::Text(value.to_string()));
        }
        self
    }

    /// `column IN (?, ...)` when the list is non-empty.
    pub(crate) fn any_of(mut self, column: &'static str, values: &[String]) -> Self {
        if !values.is_empty() {
            let marks = vec!["?"; values.len()].join(", ");
            self.clauses.push(format!("{column} IN ({marks})"));
            self.params
                .extend(values.iter().cloned().map(SqlValue::Text));
        }
        self
    }

    /// `flag = 0` when `enabled`.
    pub(crate) fn unset(mut self, flag: Flag, enabled: bool) -> Self {
        if enabled {
            self.clauses.push(format!("{} = ?", flag.column()));
            self.params
                .push(SqlValue::Integer(i64::from(TriState::Unset)));
        }
        self
    }

    /// ` WHERE a AND b ...`, or an empty string when nothing is active.
    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Bound values in clause order, followed by `extra`.
    pub(crate) fn into_params(self, extra: impl IntoIterator<Item = SqlValue>) -> Vec<SqlValue> {
        let mut params = self.params;
        params.extend(extra);
        params
    }
}

impl From<&ListQuery> for Filter {
    fn from(query: &ListQuery) -> Self {
        Self::new()
            .eq("product", query.product.as_deref())
            .eq("version", query.version.as_deref())
            .eq("commit_sha", query.commit.as_deref())
            .any_of("os", &query.os)
            .any_of("arch", &query.arch)
            .unset(Flag::Tested, query.exclude_tested)
            .unset(Flag::Published, query.exclude_published)
            .unset(Flag::Packed, query.exclude_packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where() {
        let filter = Filter::from(&ListQuery::default());
        assert_eq!(filter.where_clause(), "");
        assert!(filter.into_params([]).is_empty());
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let query = ListQuery {
            product: Some("x'; DROP TABLE versions; --".into()),
            os: vec!["apple".into(), "linux".into()],
            exclude_packed: true,
            ..ListQuery::default()
        };
        let filter = Filter::from(&query);

        assert_eq!(
            filter.where_clause(),
            " WHERE product = ? AND os IN (?, ?) AND packed = ?"
        );
        let params = filter.into_params([SqlValue::Integer(5)]);
        assert_eq!(params.len(), 5);
        assert_eq!(
            params[0],
            SqlValue::Text("x'; DROP TABLE versions; --".into())
        );
        assert_eq!(params[3], SqlValue::Integer(0));
        assert_eq!(params[4], SqlValue::Integer(5));
    }
}
