//! Object mutation records carried on data feeds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One mutation of an object: its id, its type, and the new state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    /// Object id (expected to be a canonical [`crate::ObjectId`]).
    pub id: String,
    /// Explicit typename, e.g. `dxn:type:example.com/type/Task`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typename: Option<String>,
    /// Object state after the mutation.
    #[serde(default)]
    pub payload: Value,
}

impl MutationRecord {
    /// Build a record with an explicit typename.
    #[must_use]
    pub fn new(id: impl Into<String>, typename: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            typename: Some(typename.into()),
            payload,
        }
    }

    /// The derived typename: the explicit field when non-empty, otherwise the
    /// payload's `"@type"` string.
    pub fn typename(&self) -> Option<&str> {
        self.typename
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.payload
                    .get("@type")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_typename_wins() {
        let record = MutationRecord::new("id", "example.Task", json!({ "@type": "other" }));
        assert_eq!(record.typename(), Some("example.Task"));
    }

    #[test]
    fn falls_back_to_payload_type() {
        let record = MutationRecord {
            id: "id".into(),
            typename: Some(String::new()),
            payload: json!({ "@type": "example.Note" }),
        };
        assert_eq!(record.typename(), Some("example.Note"));
    }

    #[test]
    fn no_typename_anywhere() {
        let record = MutationRecord {
            id: "id".into(),
            typename: None,
            payload: json!({ "title": "x" }),
        };
        assert_eq!(record.typename(), None);
    }
}
