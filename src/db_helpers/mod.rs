use sqlx::mysql::{MySqlArguments, MySqlQueryResult};
use sqlx::Arguments;

use crate::errors::{Error, Result};
use crate::models::{AdminStatus, ArticleStatus};

mod admin_helpers;
mod article_helpers;

pub use admin_helpers::*;
pub use article_helpers::*;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
enum Param {
    Unsigned(u64),
    Tiny(i8),
    Bool(bool),
    Text(String),
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<AdminStatus> for Param {
    fn from(value: AdminStatus) -> Self {
        Self::Tiny(value as i8)
    }
}

impl From<ArticleStatus> for Param {
    fn from(value: ArticleStatus) -> Self {
        Self::Tiny(value as i8)
    }
}

/// Joins `column = ?` conditions for the values that are present.
///
/// Column names are always literals from this module; only values are bound.
struct QueryBuilder {
    query: String,
    params: Vec<Param>,
    seperator: Option<&'static str>,
    counter: usize,
}

impl QueryBuilder {
    fn new(initial: String, seperator: Option<&'static str>) -> Self {
        Self {
            query: initial,
            params: vec![],
            seperator,
            counter: 0,
        }
    }

    fn add_param<T: Into<Param>>(self, column: &'static str, param: Option<T>) -> Self {
        self.add_condition(
            &format!("{column} = ?"),
            param.map(|value| vec![value.into()]),
        )
    }

    /// `params` must line up with the placeholders in `condition`.
    fn add_condition(mut self, condition: &str, params: Option<Vec<Param>>) -> Self {
        if let Some(values) = params {
            self.query.push_str(condition);
            if let Some(seperator) = self.seperator {
                self.query.push_str(seperator);
            }
            self.params.extend(values);
            self.counter += 1;
        }
        self
    }

    fn trim(mut self) -> Self {
        if let Some(seperator) = self.seperator {
            if let Some(stripped) = self.query.strip_suffix(seperator) {
                self.query = stripped.to_owned();
            }
        }
        self
    }

    /// Returns an empty query when no condition was added.
    fn build(mut self) -> (String, Vec<Param>) {
        self = self.trim();
        if self.counter == 0 {
            self.query = String::new();
        }
        (self.query, self.params)
    }
}

/// `WHERE` clause that always excludes soft-deleted rows.
fn live_rows_where(conditions: &str) -> String {
    if conditions.is_empty() {
        "WHERE deleted_at IS NULL".to_owned()
    } else {
        format!("WHERE deleted_at IS NULL AND {conditions}")
    }
}

fn arguments(params: &[Param]) -> Result<MySqlArguments> {
    let mut args = MySqlArguments::default();
    for param in params {
        let added = match param {
            Param::Unsigned(value) => args.add(*value),
            Param::Tiny(value) => args.add(*value),
            Param::Bool(value) => args.add(*value),
            Param::Text(value) => args.add(value.clone()),
        };
        added.map_err(|e| Error::Storage(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

/// `NotFound` when the statement matched no row.
fn ensure_affected(result: MySqlQueryResult, what: &'static str) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(what));
    }
    Ok(())
}

/// Escapes `LIKE` wildcards so the keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_conditions_for_present_values() {
        let (query, params) = QueryBuilder::new(String::new(), Some(" AND "))
            .add_param("category_id", Some(3u64))
            .add_param("status", None::<ArticleStatus>)
            .add_param("author_id", Some(9u64))
            .add_param("is_top", Some(true))
            .build();

        assert_eq!(query, "category_id = ? AND author_id = ? AND is_top = ?");
        assert_eq!(
            params,
            vec![Param::Unsigned(3), Param::Unsigned(9), Param::Bool(true)]
        );
    }

    #[test]
    fn empty_builder_yields_empty_query() {
        let (query, params) = QueryBuilder::new(String::new(), Some(" AND "))
            .add_param("category_id", None::<u64>)
            .build();

        assert!(query.is_empty());
        assert!(params.is_empty());
        assert_eq!(live_rows_where(&query), "WHERE deleted_at IS NULL");
    }

    #[test]
    fn statuses_bind_as_tinyint() {
        assert_eq!(Param::from(ArticleStatus::Published), Param::Tiny(2));
        assert_eq!(Param::from(AdminStatus::Disabled), Param::Tiny(2));
    }

    #[test]
    fn raw_conditions_keep_their_shape() {
        let pattern = like_pattern("rust");
        let (query, params) = QueryBuilder::new(String::new(), Some(" AND "))
            .add_param("status", Some(ArticleStatus::Published))
            .add_condition(
                "(title LIKE ? OR content LIKE ?)",
                Some(vec![pattern.clone().into(), pattern.into()]),
            )
            .build();

        assert_eq!(
            live_rows_where(&query),
            "WHERE deleted_at IS NULL AND status = ? AND (title LIKE ? OR content LIKE ?)"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[1], Param::Text("%rust%".into()));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("foo"), "%foo%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn arguments_accept_every_param_kind() {
        let args = arguments(&[
            Param::Unsigned(1),
            Param::Tiny(2),
            Param::Bool(false),
            Param::Text("x".into()),
        ]);
        assert!(args.is_ok());
    }
}
