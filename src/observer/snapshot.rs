use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::observer::error::NotifierError;

/// Field-name to value mapping of an entity at one instant, keys in sorted order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    /// Serialize an entity into a snapshot; the entity must serialize to an object
    pub fn capture<T: Serialize>(entity: &T) -> Result<Self, NotifierError> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(NotifierError::Snapshot(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Item {
        sku: &'static str,
        name: &'static str,
        price: f64,
    }

    #[test]
    fn captures_fields_in_key_order() {
        let snapshot = Snapshot::capture(&Item {
            sku: "Sku1",
            name: "Product1",
            price: 1.0,
        })
        .unwrap();

        let keys: Vec<&String> = snapshot.keys().collect();
        assert_eq!(keys, ["name", "price", "sku"]);
        assert_eq!(snapshot.get("price"), Some(&json!(1.0)));
    }

    #[test]
    fn rejects_non_object_entities() {
        assert!(matches!(
            Snapshot::capture(&vec![1, 2, 3]),
            Err(NotifierError::Snapshot(_))
        ));
    }
}
