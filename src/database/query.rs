use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

use crate::config::ApiConfig;
use crate::database::DatabaseError;

/// Columns a listing may be ordered by, with the default
pub struct Sortable {
    pub columns: &'static [&'static str],
    pub default: &'static str,
}

pub const USER_SORT: Sortable = Sortable {
    columns: &["email", "created_at", "updated_at"],
    default: "email",
};

pub const BRAND_SORT: Sortable = Sortable {
    columns: &["name", "created_at", "updated_at"],
    default: "name",
};

pub const PRODUCT_SORT: Sortable = Sortable {
    columns: &["name", "sku", "price", "views", "created_at", "updated_at"],
    default: "name",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    /// Parse `name` or `-name` against the whitelist
    pub fn parse(raw: Option<&str>, sortable: &Sortable) -> Result<Self, DatabaseError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(sortable.default);
        let (name, direction) = match raw.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Desc),
            None => (raw, SortDirection::Asc),
        };
        let column = sortable
            .columns
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| DatabaseError::InvalidSort(name.to_string()))?;
        Ok(Self { column, direction })
    }

    pub fn to_sql(&self) -> String {
        format!("ORDER BY \"{}\" {}", self.column, self.direction.to_sql())
    }

    /// Order two serialized rows the way the SQL clause would
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(&a[self.column], &b[self.column]);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Query string of every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
    pub order: OrderBy,
}

impl Page {
    pub fn from_query(
        query: &ListQuery,
        sortable: &Sortable,
        api: &ApiConfig,
    ) -> Result<Self, DatabaseError> {
        Ok(Self {
            offset: query.offset.unwrap_or(0).max(0),
            limit: query
                .limit
                .unwrap_or(api.default_page_limit)
                .clamp(0, api.max_page_limit),
            order: OrderBy::parse(query.order_by.as_deref(), sortable)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    #[test]
    fn defaults_to_sortable_default() {
        let order = OrderBy::parse(None, &BRAND_SORT).unwrap();
        assert_eq!(order.column, "name");
        assert_eq!(order.direction, SortDirection::Asc);
        assert_eq!(order.to_sql(), "ORDER BY \"name\" ASC");
    }

    #[test]
    fn leading_dash_sorts_descending() {
        let order = OrderBy::parse(Some("-price"), &PRODUCT_SORT).unwrap();
        assert_eq!(order.column, "price");
        assert_eq!(order.direction, SortDirection::Desc);
    }

    #[test]
    fn rejects_unlisted_columns() {
        assert!(matches!(
            OrderBy::parse(Some("hashed_password"), &USER_SORT),
            Err(DatabaseError::InvalidSort(c)) if c == "hashed_password"
        ));
        assert!(OrderBy::parse(Some("name; DROP TABLE brands"), &BRAND_SORT).is_err());
    }

    #[test]
    fn page_clamps_limit_and_offset() {
        let api = AppConfig::development().api;
        let query = ListQuery {
            offset: Some(-5),
            limit: Some(1_000_000),
            order_by: None,
        };
        let page = Page::from_query(&query, &PRODUCT_SORT, &api).unwrap();
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, api.max_page_limit);

        let page = Page::from_query(&ListQuery::default(), &PRODUCT_SORT, &api).unwrap();
        assert_eq!(page.limit, api.default_page_limit);
    }

    #[test]
    fn compares_numbers_and_strings() {
        let order = OrderBy::parse(Some("price"), &PRODUCT_SORT).unwrap();
        assert_eq!(
            order.compare(&json!({"price": 1.5}), &json!({"price": 10.0})),
            Ordering::Less
        );

        let order = OrderBy::parse(Some("-name"), &PRODUCT_SORT).unwrap();
        assert_eq!(
            order.compare(&json!({"name": "a"}), &json!({"name": "b"})),
            Ordering::Greater
        );
    }
}
