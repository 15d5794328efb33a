// ── Node classification ──
//
// Decides, for one JSON node and the key it was found under, whether it is
// a record, a container to descend into, or something to report.

use serde_json::Value;

use crate::model::RecordKind;

/// Fields that mark an object as a terminal record.
const RECORD_MARKERS: [&str; 3] = ["id", "name", "lang"];

/// Outcome of looking at one node of a response tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A record of this kind; stop descending.
    Record(RecordKind),
    /// An object or array that may contain records.
    Subtree,
    /// Looks like a record, but the enclosing key names no known kind.
    Unrecognized { context: Option<String> },
    /// A scalar outside any record.
    Leaf,
}

/// Classify `node`, found under the key `parent` (`None` at the root).
pub fn classify(node: &Value, parent: Option<&str>) -> Classification {
    match node {
        Value::Object(map) => {
            if !RECORD_MARKERS.iter().all(|k| map.contains_key(*k)) {
                return Classification::Subtree;
            }
            if map.contains_key("login_id") {
                return Classification::Record(RecordKind::Login);
            }
            match parent.and_then(RecordKind::from_context) {
                Some(kind) => Classification::Record(kind),
                None => Classification::Unrecognized {
                    context: parent.map(str::to_owned),
                },
            }
        }
        Value::Array(_) => Classification::Subtree,
        _ => Classification::Leaf,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn login_id_beats_context() {
        let node = json!({"id": 1, "name": "a", "lang": "en", "login_id": "a"});
        assert_eq!(
            classify(&node, Some("places")),
            Classification::Record(RecordKind::Login)
        );
    }

    #[test]
    fn context_selects_data_kind() {
        let node = json!({"id": 1, "name": "a", "lang": "en"});
        assert_eq!(
            classify(&node, Some("my_info")),
            Classification::Record(RecordKind::User)
        );
        assert_eq!(
            classify(&node, Some("things")),
            Classification::Record(RecordKind::Thing)
        );
        assert_eq!(
            classify(&node, Some("widgets")),
            Classification::Unrecognized {
                context: Some("widgets".into())
            }
        );
        assert_eq!(
            classify(&node, None),
            Classification::Unrecognized { context: None }
        );
    }

    #[test]
    fn partial_triple_is_a_subtree() {
        let node = json!({"id": 1, "name": "a"});
        assert_eq!(classify(&node, Some("places")), Classification::Subtree);
        assert_eq!(classify(&json!([1, 2]), None), Classification::Subtree);
        assert_eq!(classify(&json!("x"), None), Classification::Leaf);
    }
}
