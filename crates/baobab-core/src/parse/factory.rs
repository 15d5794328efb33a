// ── Record factory ──
//
// Recursive descent over a response tree. Every node classified as a
// record is decoded on the spot; failures are collected per node so that
// siblings still come through. Deduplication against the cache happens
// when the caller merges the outcome, not here.

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use super::classify::{Classification, classify};
use super::wire::WireRecord;
use crate::error::CoreError;
use crate::model::Record;

/// Key whose children keep the context of the level above.
const RESULTS_KEY: &str = "results";

/// Everything one response yielded.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Freshly decoded records, in document order.
    pub records: Vec<Record>,
    /// One entry per node that could not be turned into a record.
    pub errors: Vec<CoreError>,
}

impl ParseOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}

#[derive(Default)]
struct Descent {
    outcome: ParseOutcome,
    stray_leaves: usize,
}

impl Descent {
    fn visit(&mut self, node: &Value, context: Option<&str>) {
        match classify(node, context) {
            Classification::Record(kind) => match WireRecord::decode(node) {
                Ok(wire) => self.outcome.records.push(wire.into_record(kind)),
                Err(e) => {
                    warn!(%kind, error = %e, "dropping malformed record");
                    self.outcome.errors.push(e);
                }
            },
            Classification::Unrecognized { context } => {
                let context = context.unwrap_or_else(|| "<root>".into());
                warn!(context = %context, "record under unrecognized key");
                self.outcome.errors.push(CoreError::data(
                    format!("record found under unrecognized key {context:?}"),
                    Some(node.to_string().into()),
                ));
            }
            Classification::Subtree => match node {
                Value::Object(map) => {
                    for (key, child) in map {
                        let child_context = if key == RESULTS_KEY {
                            context
                        } else {
                            Some(key.as_str())
                        };
                        self.visit(child, child_context);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        self.visit(item, context);
                    }
                }
                _ => {}
            },
            Classification::Leaf => self.stray_leaves += 1,
        }
    }
}

/// Parse an already-decoded JSON tree.
pub fn parse_value(root: &Value) -> ParseOutcome {
    parse_value_in(root, None)
}

/// Parse a tree whose root sits under the key `context`.
pub fn parse_value_in(root: &Value, context: Option<&str>) -> ParseOutcome {
    let mut descent = Descent::default();
    descent.visit(root, context);

    let Descent {
        mut outcome,
        stray_leaves,
    } = descent;
    if outcome.is_empty() && stray_leaves > 0 {
        outcome.errors.push(CoreError::data(
            "response contains no records",
            Some(root.to_string().into()),
        ));
    }
    outcome
}

/// Parse a raw response body into candidate records.
///
/// A body that is not JSON yields exactly one data error carrying the
/// bytes. A JSON body whose only content is loose scalars yields one data
/// error as well. Neither case panics or aborts siblings.
pub fn parse_records(body: &Bytes) -> ParseOutcome {
    parse_records_in(body, None)
}

/// Like [`parse_records`], for endpoints that may answer with a bare
/// record whose kind is implied by `context`.
pub fn parse_records_in(body: &Bytes, context: Option<&str>) -> ParseOutcome {
    match serde_json::from_slice::<Value>(body) {
        Ok(root) => {
            let outcome = parse_value_in(&root, context);
            debug!(
                records = outcome.records.len(),
                errors = outcome.errors.len(),
                "parsed response"
            );
            outcome
        }
        Err(e) => ParseOutcome {
            records: Vec::new(),
            errors: vec![CoreError::data(
                format!("response is not JSON: {e}"),
                Some(body.clone()),
            )],
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::RecordKind;

    fn parse(value: &Value) -> ParseOutcome {
        parse_records(&Bytes::from(value.to_string()))
    }

    #[test]
    fn single_place() {
        let outcome = parse(&json!({
            "places": [{"id": 2, "name": "X", "lang": "en", "writeable": true}]
        }));
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 1);
        let place = &outcome.records[0];
        assert_eq!(place.kind(), RecordKind::Place);
        assert_eq!(place.id(), 2);
        assert!(place.is_writeable());
        assert!(!place.is_dirty());
    }

    #[test]
    fn results_key_keeps_parent_context() {
        let outcome = parse(&json!({
            "things": {"results": [
                {"id": 4, "name": "Lamp", "lang": "en"},
                {"id": 9, "name": "Desk", "lang": "en"}
            ]}
        }));
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| r.kind() == RecordKind::Thing));
    }

    #[test]
    fn nested_mixed_tree() {
        let outcome = parse(&json!({
            "my_info": {"id": 10, "name": "Me", "lang": "en"},
            "security": {"logins": [{"id": 10, "name": "me", "lang": "en", "login_id": "me"}]}
        }));
        let kinds: Vec<_> = outcome.records.iter().map(Record::kind).collect();
        assert_eq!(kinds, vec![RecordKind::User, RecordKind::Login]);
    }

    #[test]
    fn bad_node_does_not_drop_siblings() {
        let outcome = parse(&json!({
            "places": [
                {"id": "nope", "name": "X", "lang": "en"},
                {"id": 3, "name": "Y", "lang": "en"}
            ],
            "widgets": [{"id": 4, "name": "Z", "lang": "en"}]
        }));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id(), 3);
        assert_eq!(outcome.errors.len(), 2);
    }

    #[test]
    fn stray_leaf_without_records_is_one_error() {
        let outcome = parse(&json!({"status": "ok"}));
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].body().is_some());
    }

    #[test]
    fn empty_containers_are_silent() {
        let outcome = parse(&json!({"places": []}));
        assert!(outcome.is_empty());
    }

    #[test]
    fn bare_record_takes_supplied_context() {
        let body = Bytes::from_static(br#"{"id": 6, "name": "Me", "lang": "en"}"#);
        assert_eq!(parse_records(&body).errors.len(), 1);

        let outcome = parse_records_in(&body, Some("my_info"));
        assert_eq!(outcome.records[0].kind(), RecordKind::User);
    }

    #[test]
    fn non_json_body_is_one_error_with_bytes() {
        let body = Bytes::from_static(b"<html>oops</html>");
        let outcome = parse_records(&body);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].body(), Some(&body));
    }
}
