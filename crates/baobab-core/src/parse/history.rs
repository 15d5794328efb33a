// ── Save-response change history ──
//
// A save response may report what changed as nested objects with sibling
// `before` and `after` keys. Each side is decoded into a standalone record
// that never enters the cache.

use serde_json::Value;
use tracing::warn;

use super::classify::{Classification, classify};
use super::factory::parse_value;
use super::wire::WireRecord;
use crate::model::{ChangeRecord, Record, RecordKind};

/// Decode one side of a change pair as a detached record of `kind`.
fn snapshot(side: &Value, kind: RecordKind) -> Option<Record> {
    if side.is_null() {
        return None;
    }
    match classify(side, Some(kind.context_name())) {
        Classification::Record(found) => match WireRecord::decode(side) {
            Ok(wire) => Some(wire.into_record(found)),
            Err(e) => {
                warn!(error = %e, "unreadable change snapshot");
                None
            }
        },
        _ => parse_value(side).records.into_iter().next(),
    }
}

fn scan(node: &Value, kind: RecordKind, out: &mut Vec<ChangeRecord>) {
    match node {
        Value::Object(map) => {
            if let (Some(before), Some(after)) = (map.get("before"), map.get("after")) {
                out.push(ChangeRecord {
                    before: snapshot(before, kind),
                    after: snapshot(after, kind),
                });
                return;
            }
            for child in map.values() {
                scan(child, kind, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                scan(item, kind, out);
            }
        }
        _ => {}
    }
}

/// Every before/after pair in a save response for a record of `kind`.
pub fn collect_changes(body: &Value, kind: RecordKind) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();
    scan(body, kind, &mut changes);
    changes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn finds_nested_pairs() {
        let body = json!({
            "places": {
                "changed_places": [{
                    "before": {"id": 2, "name": "Old", "lang": "en"},
                    "after": {"id": 2, "name": "New", "lang": "en"}
                }]
            }
        });
        let changes = collect_changes(&body, RecordKind::Place);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before.as_ref().unwrap().name(), "Old");
        assert_eq!(changes[0].after.as_ref().unwrap().name(), "New");
        assert_eq!(
            changes[0].after.as_ref().unwrap().kind(),
            RecordKind::Place
        );
    }

    #[test]
    fn login_sides_keep_login_kind() {
        let body = json!({
            "before": {"id": 5, "name": "a", "lang": "en", "login_id": "a"},
            "after": {"id": 5, "name": "b", "lang": "en", "login_id": "b"}
        });
        let changes = collect_changes(&body, RecordKind::Login);
        assert_eq!(
            changes[0].after.as_ref().unwrap().security().unwrap().login_id(),
            Some("b")
        );
    }

    #[test]
    fn missing_side_is_none() {
        let body = json!({"before": null, "after": {"id": 9, "name": "n", "lang": "en"}});
        let changes = collect_changes(&body, RecordKind::Thing);
        assert!(changes[0].before.is_none());
        assert!(changes[0].after.is_some());
        assert!(collect_changes(&json!({"ok": true}), RecordKind::Thing).is_empty());
    }
}
