// ── Baseline responses ──
//
// The baseline plugin answers with a flat, kind-tagged dictionary under a
// `baseline` wrapper instead of a record tree. Only a fixed set of keys is
// understood; anything else is reported and skipped.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::CoreError;
use crate::model::RecordKind;

const WRAPPER_KEY: &str = "baseline";

/// Keys the baseline dictionary may contain.
pub const BASELINE_KEYS: [&str; 10] = [
    "people",
    "places",
    "things",
    "plugins",
    "serverinfo",
    "search_location",
    "tokens",
    "bulk_upload",
    "token",
    "id",
];

/// Decoded content of a baseline response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineInfo {
    /// Plugin paths the server exposes.
    pub plugins: Vec<String>,
    /// IDs per owning kind, from the handler resolver.
    pub handlers: BTreeMap<RecordKind, Vec<i64>>,
    pub server_info: Option<Value>,
}

/// Decoded baseline plus one error per key that could not be used.
#[derive(Debug, Default)]
pub struct BaselineOutcome {
    pub info: BaselineInfo,
    pub errors: Vec<CoreError>,
}

fn field_error(key: &str, what: &str, value: &Value) -> CoreError {
    CoreError::data(
        format!("baseline key {key:?} {what}"),
        Some(value.to_string().into()),
    )
}

fn id_list(key: &str, value: &Value) -> Result<Vec<i64>, CoreError> {
    value
        .as_array()
        .and_then(|items| items.iter().map(Value::as_i64).collect())
        .ok_or_else(|| field_error(key, "is not a list of integer ids", value))
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>, CoreError> {
    value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .ok_or_else(|| field_error(key, "is not a list of strings", value))
}

/// Parse a baseline or handler-resolver body.
pub fn parse_baseline(body: &Bytes) -> BaselineOutcome {
    let mut outcome = BaselineOutcome::default();

    let root: Value = match serde_json::from_slice(body) {
        Ok(root) => root,
        Err(e) => {
            outcome.errors.push(CoreError::data(
                format!("baseline response is not JSON: {e}"),
                Some(body.clone()),
            ));
            return outcome;
        }
    };
    let Some(map) = root.get(WRAPPER_KEY).and_then(Value::as_object) else {
        outcome.errors.push(CoreError::data(
            "baseline response has no \"baseline\" object",
            Some(body.clone()),
        ));
        return outcome;
    };

    let info = &mut outcome.info;
    for (key, value) in map {
        if !BASELINE_KEYS.contains(&key.as_str()) {
            let e = field_error(key, "is not recognized", value);
            warn!(key = %key, error = %e, "skipping baseline key");
            outcome.errors.push(e);
            continue;
        }
        let result = match key.as_str() {
            "people" | "places" | "things" => {
                id_list(key, value).map(|ids| {
                    if let Some(kind) = RecordKind::from_baseline_key(key) {
                        info.handlers.insert(kind, ids);
                    }
                })
            }
            "plugins" => string_list(key, value).map(|plugins| info.plugins = plugins),
            "serverinfo" => {
                info.server_info = Some(value.clone());
                Ok(())
            }
            _ => {
                trace!(key = %key, "ignoring baseline key");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(key = %key, error = %e, "skipping baseline key");
            outcome.errors.push(e);
        }
    }
    outcome
}
