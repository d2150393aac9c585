// handlers/protected/mod.rs - Resource handlers (bearer token required)
//
// Every handler here takes `CurrentUser`, except the product reads which take
// `MaybeUser` so anonymous visitors can browse the catalogue.

pub mod brands;
pub mod products;
pub mod users;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id; a malformed one is a field error like any other bad input
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::field_error("id", "must be a UUID"))
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        brand_id: Option<Option<Uuid>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let absent: Patch = serde_json::from_value(json!({})).unwrap();
        let null: Patch = serde_json::from_value(json!({"brand_id": null})).unwrap();
        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_value(json!({"brand_id": id})).unwrap();

        assert_eq!(absent.brand_id, None);
        assert_eq!(null.brand_id, Some(None));
        assert_eq!(set.brand_id, Some(Some(id)));
    }

    #[test]
    fn malformed_id_is_unprocessable() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
