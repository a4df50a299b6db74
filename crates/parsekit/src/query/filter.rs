//! The `where` document of a query.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field constraints of a query, keyed by field name.
///
/// Keys are kept sorted so the serialized document is stable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the constraint on a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Constrain a field to a literal value, replacing any constraint.
    pub fn equal(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Add an operator to a field's constraint.
    ///
    /// Operators on the same field merge into one document. A literal
    /// constraint is replaced.
    pub fn operator(&mut self, field: impl Into<String>, op: &str, value: Value) {
        let field = field.into();
        if let Some(Value::Object(doc)) = self.fields.get_mut(&field) {
            if is_operator_document(doc) {
                doc.insert(op.to_string(), value);
                return;
            }
        }
        let mut doc = Map::new();
        doc.insert(op.to_string(), value);
        self.fields.insert(field, Value::Object(doc));
    }

    /// Replace a field's constraint with a full operator document.
    pub fn replace(&mut self, field: impl Into<String>, doc: Map<String, Value>) {
        self.fields.insert(field.into(), Value::Object(doc));
    }

    /// The document as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

fn is_operator_document(doc: &Map<String, Value>) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}

/// Quote a string so a regular expression matches it literally.
///
/// The text is wrapped in `\Q...\E`; a literal `\E` inside it is split out
/// so it cannot end the quoted span early.
pub fn quote(s: &str) -> String {
    format!("\\Q{}\\E", s.replace("\\E", "\\E\\\\E\\Q"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparison_operators_merge() {
        let mut filter = Filter::new();
        filter.operator("x", "$gt", json!(5));
        filter.operator("x", "$lte", json!(10));
        assert_eq!(filter.to_value(), json!({ "x": { "$gt": 5, "$lte": 10 } }));
    }

    #[test]
    fn equality_overwrites() {
        let mut filter = Filter::new();
        filter.operator("x", "$gt", json!(5));
        filter.equal("x", json!(7));
        assert_eq!(filter.to_value(), json!({ "x": 7 }));
    }

    #[test]
    fn operator_after_equality_replaces_literal() {
        let mut filter = Filter::new();
        filter.equal("x", json!(5));
        filter.operator("x", "$gt", json!(1));
        assert_eq!(filter.to_value(), json!({ "x": { "$gt": 1 } }));
    }

    #[test]
    fn operator_after_object_literal_replaces_it() {
        let mut filter = Filter::new();
        filter.equal(
            "owner",
            json!({ "__type": "Pointer", "className": "_User", "objectId": "u1" }),
        );
        filter.operator("owner", "$exists", json!(true));
        assert_eq!(filter.to_value(), json!({ "owner": { "$exists": true } }));
    }

    #[test]
    fn serialized_keys_are_sorted() {
        let mut filter = Filter::new();
        filter.equal("zeta", json!(1));
        filter.equal("alpha", json!(2));
        assert_eq!(
            serde_json::to_string(&filter.to_value()).unwrap(),
            r#"{"alpha":2,"zeta":1}"#
        );
    }

    #[test]
    fn quote_plain_text() {
        assert_eq!(quote("Al"), "\\QAl\\E");
    }

    #[test]
    fn quote_splits_end_marker() {
        assert_eq!(quote("a\\Eb"), "\\Qa\\E\\\\E\\Qb\\E");
    }
}
