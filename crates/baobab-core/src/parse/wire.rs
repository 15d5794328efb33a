// ── Wire record decoding ──
//
// The server sends one JSON object per record, with a field set that
// depends on the kind. `WireRecord` accepts the union of all of them;
// `into_record` keeps only what the classified kind carries. Required
// fields (`id`, `name`, `lang`) must have the right JSON types or the
// node is rejected. Optional fields accept an explicit `null` as absent.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::{
    AddressElements, CommonFields, Coordinate, DataFields, Fields, LoginFields, Payload,
    PlaceFields, Record, RecordBody, RecordKind, SecurityFields, ThingFields, UserFields,
};

#[derive(Debug, Deserialize)]
struct WireCoords {
    latitude: f64,
    longitude: f64,
}

impl From<WireCoords> for Coordinate {
    fn from(c: WireCoords) -> Self {
        Coordinate::new(c.latitude, c.longitude)
    }
}

/// Every field any record kind may carry.
#[derive(Debug, Deserialize)]
pub(crate) struct WireRecord {
    id: i64,
    name: String,
    lang: String,
    #[serde(default)]
    writeable: Option<bool>,
    #[serde(default)]
    read_token: Option<i64>,
    #[serde(default)]
    write_token: Option<i64>,
    #[serde(default)]
    last_access: Option<String>,

    // Security database
    #[serde(default)]
    login_id: Option<String>,
    #[serde(default)]
    security_tokens: Option<Vec<i64>>,
    #[serde(default)]
    is_manager: Option<bool>,
    #[serde(default)]
    is_main_admin: Option<bool>,
    #[serde(default)]
    user_object_id: Option<i64>,
    #[serde(default)]
    current_login: Option<bool>,

    // Data database
    #[serde(default)]
    coords: Option<WireCoords>,
    #[serde(default)]
    raw_coords: Option<WireCoords>,
    #[serde(default)]
    fuzzy: Option<bool>,
    #[serde(default)]
    fuzz_factor: Option<f64>,
    #[serde(default)]
    can_see_through_the_fuzz: Option<i64>,
    #[serde(default)]
    children: Option<BTreeMap<String, Vec<i64>>>,
    #[serde(default)]
    distance_in_km: Option<f64>,
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    payload_type: Option<String>,

    // People
    #[serde(default)]
    surname: Option<String>,
    #[serde(default)]
    middle_name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    associated_login_id: Option<i64>,

    // Places
    #[serde(default)]
    address_elements: Option<AddressElements>,

    // Things
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    description: Option<String>,

    // Free-text tags; which ones apply depends on the kind.
    #[serde(default)]
    tag2: Option<String>,
    #[serde(default)]
    tag3: Option<String>,
    #[serde(default)]
    tag4: Option<String>,
    #[serde(default)]
    tag5: Option<String>,
    #[serde(default)]
    tag6: Option<String>,
    #[serde(default)]
    tag7: Option<String>,
    #[serde(default)]
    tag8: Option<String>,
    #[serde(default)]
    tag9: Option<String>,
}

/// Accepts RFC 3339 and the server's plain `YYYY-MM-DD HH:MM:SS` (UTC).
/// Unparseable values are dropped.
fn parse_last_access(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl WireRecord {
    /// Decode one JSON node, rejecting it when typed fields do not match.
    pub(crate) fn decode(node: &Value) -> Result<Self, CoreError> {
        Self::deserialize(node).map_err(|e| {
            CoreError::data(
                format!("malformed record: {e}"),
                Some(node.to_string().into()),
            )
        })
    }

    /// Build a typed record of `kind` from the decoded fields.
    pub(crate) fn into_record(self, kind: RecordKind) -> Record {
        let common = CommonFields {
            name: self.name,
            lang: self.lang,
            read_token: self.read_token,
            write_token: self.write_token,
        };

        let data = || {
            let mut data = DataFields {
                coords: self.coords.map(Into::into),
                raw_coords: self.raw_coords.map(Into::into),
                can_see_through_the_fuzz: self.can_see_through_the_fuzz,
                children: self.children.unwrap_or_default(),
                distance_km: self.distance_in_km,
                payload: self
                    .payload
                    .map(|encoded| Payload::from_base64(encoded, self.payload_type)),
                ..DataFields::default()
            };
            data.set_fuzz_factor(self.fuzz_factor);
            // The server may flag a record fuzzy without disclosing the factor.
            data.fuzzy |= self.fuzzy.unwrap_or(false);
            data
        };

        let body = match kind {
            RecordKind::Login => RecordBody::Login {
                security: SecurityFields::new(
                    self.login_id,
                    self.security_tokens.unwrap_or_default(),
                ),
                login: LoginFields {
                    is_manager: self.is_manager.unwrap_or_default(),
                    is_main_admin: self.is_main_admin.unwrap_or_default(),
                    user_object_id: self.user_object_id,
                    current_login: self.current_login.unwrap_or_default(),
                    password: None,
                },
            },
            RecordKind::SecurityToken => RecordBody::SecurityToken {
                security: SecurityFields::new(
                    self.login_id,
                    self.security_tokens.unwrap_or_default(),
                ),
            },
            RecordKind::User => RecordBody::User {
                user: UserFields {
                    surname: self.surname,
                    middle_name: self.middle_name,
                    given_name: self.given_name,
                    prefix: self.prefix,
                    suffix: self.suffix,
                    nickname: self.nickname,
                    tag7: self.tag7,
                    tag8: self.tag8,
                    tag9: self.tag9,
                    associated_login_id: self.associated_login_id,
                },
                data: data(),
            },
            RecordKind::Place => RecordBody::Place {
                place: PlaceFields {
                    address: self.address_elements.unwrap_or_default(),
                    tag8: self.tag8,
                    tag9: self.tag9,
                },
                data: data(),
            },
            RecordKind::Thing => RecordBody::Thing {
                thing: ThingFields {
                    key: self.key,
                    description: self.description,
                    tag2: self.tag2,
                    tag3: self.tag3,
                    tag4: self.tag4,
                    tag5: self.tag5,
                    tag6: self.tag6,
                    tag7: self.tag7,
                    tag8: self.tag8,
                    tag9: self.tag9,
                },
                data: data(),
            },
        };

        Record::from_server(
            self.id,
            self.writeable.unwrap_or_default(),
            parse_last_access(self.last_access.as_deref()),
            Fields { common, body },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_id_is_rejected() {
        let node = json!({"id": "2", "name": "X", "lang": "en"});
        assert!(matches!(
            WireRecord::decode(&node),
            Err(CoreError::Data { .. })
        ));
    }

    #[test]
    fn place_keeps_address_and_couples_fuzz() {
        let node = json!({
            "id": 5, "name": "Depot", "lang": "en", "writeable": true,
            "coords": {"latitude": 38.9, "longitude": -77.0},
            "fuzz_factor": 2.5,
            "address_elements": {"town": "Washington", "state": "DC"},
            "tag8": "north",
        });
        let record = WireRecord::decode(&node).unwrap().into_record(RecordKind::Place);
        let place = record.place().unwrap();
        assert_eq!(place.address.town.as_deref(), Some("Washington"));
        assert_eq!(place.tag8.as_deref(), Some("north"));

        let data = record.data().unwrap();
        assert!(data.is_fuzzy());
        assert_eq!(data.coords(), Some(Coordinate::new(38.9, -77.0)));
        assert!(record.is_writeable());
        assert!(!record.is_dirty());
    }

    #[test]
    fn server_fuzzy_flag_without_factor() {
        let node = json!({"id": 5, "name": "Depot", "lang": "en", "fuzzy": true});
        let record = WireRecord::decode(&node).unwrap().into_record(RecordKind::Place);
        let data = record.data().unwrap();
        assert!(data.is_fuzzy());
        assert_eq!(data.fuzz_factor(), None);
    }

    #[test]
    fn explicit_nulls_read_as_absent() {
        let node = json!({
            "id": 6, "name": "Quay", "lang": "en",
            "writeable": null, "fuzzy": null,
            "security_tokens": null, "children": null, "address_elements": null,
        });
        let place = WireRecord::decode(&node).unwrap().into_record(RecordKind::Place);
        assert!(place.place().unwrap().address.town.is_none());
        assert!(!place.data().unwrap().is_fuzzy());
        assert!(!place.is_writeable());

        let login = json!({"id": 6, "name": "q", "lang": "en", "login_id": "q", "security_tokens": null, "is_manager": null});
        let login = WireRecord::decode(&login).unwrap().into_record(RecordKind::Login);
        assert_eq!(login.security().unwrap().security_tokens(), vec![1]);
    }

    #[test]
    fn login_without_tokens_still_has_token_one() {
        let node = json!({"id": 3, "name": "admin", "lang": "en", "login_id": "admin", "is_manager": true});
        let record = WireRecord::decode(&node).unwrap().into_record(RecordKind::Login);
        assert_eq!(record.security().unwrap().security_tokens(), vec![1]);
        assert!(record.login().unwrap().is_manager());
    }

    #[test]
    fn last_access_formats() {
        let rfc = parse_last_access(Some("2024-05-01T10:00:00Z")).unwrap();
        let plain = parse_last_access(Some("2024-05-01 10:00:00")).unwrap();
        assert_eq!(rfc, plain);
        assert_eq!(parse_last_access(Some("yesterday")), None);
    }
}
