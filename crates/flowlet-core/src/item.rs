// Loop items are open mappings from field name to scalar value.
//
// Decision: model the open shape as a newtype over serde_json::Map rather
// than an untyped Value, so known fields get typed accessors while template
// substitution keeps its fallback lookup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single item iterated by the loop workflows.
///
/// Keys are unique; values are JSON scalars in practice (the original flows
/// carry `name`, `code`, `usermessage`). The item is owned by the workflow
/// invocation that receives it and never mutated during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoopItem(Map<String, Value>);

impl LoopItem {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Typed accessor for the `name` field some workflow variants require.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Fallback lookup used by template substitution.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String form of a field for template substitution.
    ///
    /// Absent and null fields both render as `None`; strings render without
    /// surrounding quotes, other scalars via their JSON form.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for LoopItem {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> LoopItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_name_accessor() {
        let it = item(json!({"name": "alpha", "code": 7}));
        assert_eq!(it.name(), Some("alpha"));

        let it = item(json!({"code": 7}));
        assert_eq!(it.name(), None);
    }

    #[test]
    fn test_field_text_scalars() {
        let it = item(json!({"name": "x", "code": 42, "flag": true, "missing": null}));
        assert_eq!(it.field_text("name").as_deref(), Some("x"));
        assert_eq!(it.field_text("code").as_deref(), Some("42"));
        assert_eq!(it.field_text("flag").as_deref(), Some("true"));
        assert_eq!(it.field_text("missing"), None);
        assert_eq!(it.field_text("absent"), None);
    }

    #[test]
    fn test_transparent_serde() {
        let it = item(json!({"name": "x"}));
        let round = serde_json::to_value(&it).unwrap();
        assert_eq!(round, json!({"name": "x"}));
    }
}
