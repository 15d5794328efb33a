// ── Records and change tracking ──
//
// A `Record` is one flat struct: identity and server-granted attributes on
// the outside, two snapshots of its editable fields inside. `current` is
// what setters touch; `original` is what the server last confirmed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use super::data::DataFields;
use super::kind::{Database, RecordKey, RecordKind};
use super::security::{LoginFields, Permissions, SecurityFields};
use super::variants::{PlaceFields, ThingFields, UserFields};
use crate::error::CoreError;

/// Editable attributes every record has.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommonFields {
    pub name: String,
    pub lang: String,
    pub read_token: Option<i64>,
    pub write_token: Option<i64>,
}

/// Kind-specific payload of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Login {
        security: SecurityFields,
        login: LoginFields,
    },
    SecurityToken {
        security: SecurityFields,
    },
    User {
        data: DataFields,
        user: UserFields,
    },
    Place {
        data: DataFields,
        place: PlaceFields,
    },
    Thing {
        data: DataFields,
        thing: ThingFields,
    },
}

impl RecordBody {
    /// An empty body of the given kind.
    pub fn empty(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Login => Self::Login {
                security: SecurityFields::new(None, []),
                login: LoginFields::default(),
            },
            RecordKind::SecurityToken => Self::SecurityToken {
                security: SecurityFields::new(None, []),
            },
            RecordKind::User => Self::User {
                data: DataFields::default(),
                user: UserFields::default(),
            },
            RecordKind::Place => Self::Place {
                data: DataFields::default(),
                place: PlaceFields::default(),
            },
            RecordKind::Thing => Self::Thing {
                data: DataFields::default(),
                thing: ThingFields::default(),
            },
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Login { .. } => RecordKind::Login,
            Self::SecurityToken { .. } => RecordKind::SecurityToken,
            Self::User { .. } => RecordKind::User,
            Self::Place { .. } => RecordKind::Place,
            Self::Thing { .. } => RecordKind::Thing,
        }
    }

    pub fn security(&self) -> Option<&SecurityFields> {
        match self {
            Self::Login { security, .. } | Self::SecurityToken { security } => Some(security),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&DataFields> {
        match self {
            Self::User { data, .. } | Self::Place { data, .. } | Self::Thing { data, .. } => {
                Some(data)
            }
            _ => None,
        }
    }

    fn security_mut(&mut self) -> Option<&mut SecurityFields> {
        match self {
            Self::Login { security, .. } | Self::SecurityToken { security } => Some(security),
            _ => None,
        }
    }

    fn data_mut(&mut self) -> Option<&mut DataFields> {
        match self {
            Self::User { data, .. } | Self::Place { data, .. } | Self::Thing { data, .. } => {
                Some(data)
            }
            _ => None,
        }
    }
}

/// One snapshot of a record's editable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    pub common: CommonFields,
    pub body: RecordBody,
}

impl Fields {
    pub fn empty(kind: RecordKind) -> Self {
        Self {
            common: CommonFields::default(),
            body: RecordBody::empty(kind),
        }
    }

    /// Flatten the snapshot into the query parameters a save sends.
    ///
    /// Absent optional values are omitted. Server-owned attributes
    /// (manager flags, children, distance, linkage ids) never appear.
    pub fn to_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        let mut put = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                params.insert(key, value);
            }
        };

        put("name", Some(self.common.name.clone()));
        put("lang", Some(self.common.lang.clone()));
        put("read_token", self.common.read_token.map(|t| t.to_string()));
        put("write_token", self.common.write_token.map(|t| t.to_string()));

        if let Some(security) = self.body.security() {
            put("login_id", security.login_id.clone());
            put(
                "security_tokens",
                Some(
                    security
                        .security_tokens()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            );
        }

        if let Some(data) = self.body.data() {
            put("latitude", data.coords.map(|c| c.latitude.to_string()));
            put("longitude", data.coords.map(|c| c.longitude.to_string()));
            put("fuzz_factor", data.fuzz_factor.map(|f| f.to_string()));
            put(
                "can_see_through_the_fuzz",
                data.can_see_through_the_fuzz.map(|t| t.to_string()),
            );
            if let Some(payload) = &data.payload {
                put("payload", Some(payload.encoded().to_owned()));
                put("payload_type", payload.mime_type().map(str::to_owned));
            }
        }

        match &self.body {
            RecordBody::Login { login, .. } => {
                put(
                    "password",
                    login.password.as_ref().map(|p| p.expose_secret().to_owned()),
                );
            }
            RecordBody::User { user, .. } => {
                for (key, value) in [
                    ("surname", &user.surname),
                    ("middle_name", &user.middle_name),
                    ("given_name", &user.given_name),
                    ("prefix", &user.prefix),
                    ("suffix", &user.suffix),
                    ("nickname", &user.nickname),
                    ("tag7", &user.tag7),
                    ("tag8", &user.tag8),
                    ("tag9", &user.tag9),
                ] {
                    put(key, value.clone());
                }
            }
            RecordBody::Place { place, .. } => {
                for (key, value) in place.address.entries() {
                    put(key, value.map(str::to_owned));
                }
                put("tag8", place.tag8.clone());
                put("tag9", place.tag9.clone());
            }
            RecordBody::Thing { thing, .. } => {
                for (key, value) in [
                    ("key", &thing.key),
                    ("description", &thing.description),
                    ("tag2", &thing.tag2),
                    ("tag3", &thing.tag3),
                    ("tag4", &thing.tag4),
                    ("tag5", &thing.tag5),
                    ("tag6", &thing.tag6),
                    ("tag7", &thing.tag7),
                    ("tag8", &thing.tag8),
                    ("tag9", &thing.tag9),
                ] {
                    put(key, value.clone());
                }
            }
            RecordBody::SecurityToken { .. } => {}
        }

        params
    }
}

/// A before/after pair reported by the server in a save response.
///
/// Either side may be missing when the server only sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub before: Option<Record>,
    pub after: Option<Record>,
}

/// A single BAOBAB record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: i64,
    writeable: bool,
    last_access: Option<DateTime<Utc>>,
    current: Fields,
    original: Fields,
    history: Vec<ChangeRecord>,
}

impl Record {
    /// A new, unsaved record of `kind`. Always dirty until saved.
    pub fn new(kind: RecordKind) -> Self {
        Self::from_server(0, true, None, Fields::empty(kind))
    }

    pub(crate) fn from_server(
        id: i64,
        writeable: bool,
        last_access: Option<DateTime<Utc>>,
        fields: Fields,
    ) -> Self {
        Self {
            id,
            writeable,
            last_access,
            original: fields.clone(),
            current: fields,
            history: Vec::new(),
        }
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn kind(&self) -> RecordKind {
        self.current.body.kind()
    }

    pub fn database(&self) -> Database {
        self.kind().database()
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.id, self.database())
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    pub fn is_writeable(&self) -> bool {
        self.writeable
    }

    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.last_access
    }

    // ── Current values ───────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.current.common.name
    }

    pub fn lang(&self) -> &str {
        &self.current.common.lang
    }

    pub fn read_token(&self) -> Option<i64> {
        self.current.common.read_token
    }

    pub fn write_token(&self) -> Option<i64> {
        self.current.common.write_token
    }

    /// The editable snapshot.
    pub fn fields(&self) -> &Fields {
        &self.current
    }

    /// The snapshot last confirmed by the server.
    pub fn original(&self) -> &Fields {
        &self.original
    }

    pub fn body(&self) -> &RecordBody {
        &self.current.body
    }

    pub fn security(&self) -> Option<&SecurityFields> {
        self.current.body.security()
    }

    pub fn data(&self) -> Option<&DataFields> {
        self.current.body.data()
    }

    pub fn login(&self) -> Option<&LoginFields> {
        match &self.current.body {
            RecordBody::Login { login, .. } => Some(login),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&UserFields> {
        match &self.current.body {
            RecordBody::User { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn place(&self) -> Option<&PlaceFields> {
        match &self.current.body {
            RecordBody::Place { place, .. } => Some(place),
            _ => None,
        }
    }

    pub fn thing(&self) -> Option<&ThingFields> {
        match &self.current.body {
            RecordBody::Thing { thing, .. } => Some(thing),
            _ => None,
        }
    }

    /// Save responses seen for this record, oldest first.
    pub fn history(&self) -> &[ChangeRecord] {
        &self.history
    }

    // ── Dirty tracking ───────────────────────────────────────────────

    /// A record is dirty when it differs from the server's copy, or has
    /// never been saved.
    pub fn is_dirty(&self) -> bool {
        self.id == 0 || self.current != self.original
    }

    /// Discard local edits.
    pub fn revert(&mut self) {
        self.current = self.original.clone();
    }

    /// Parameters that differ between `current` and `original`. A new
    /// record sends everything it has. Cleared values go out empty.
    pub fn changed_parameters(&self) -> Vec<(String, String)> {
        let current = self.current.to_params();
        if self.is_new() {
            return current
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect();
        }

        let original = self.original.to_params();
        let mut changed: Vec<(String, String)> = current
            .iter()
            .filter(|(k, v)| original.get(*k) != Some(*v))
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        changed.extend(
            original
                .keys()
                .filter(|k| !current.contains_key(*k))
                .map(|k| ((*k).to_owned(), String::new())),
        );
        changed.sort();
        changed
    }

    /// Accept `sent` as the server's copy after a successful save.
    ///
    /// The write-only password is dropped from both snapshots.
    pub(crate) fn commit(&mut self, mut sent: Fields) {
        clear_password(&mut sent);
        clear_password(&mut self.current);
        self.original = sent;
    }

    pub(crate) fn push_history(&mut self, change: ChangeRecord) {
        self.history.push(change);
    }

    // ── Setters ──────────────────────────────────────────────────────

    fn ensure_writeable(&self) -> Result<(), CoreError> {
        if self.writeable {
            Ok(())
        } else {
            Err(CoreError::NotWriteable { id: self.id })
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        self.current.common.name = name.into();
        Ok(())
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        self.current.common.lang = lang.into();
        Ok(())
    }

    pub fn set_read_token(&mut self, token: Option<i64>) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        self.current.common.read_token = token;
        Ok(())
    }

    pub fn set_write_token(&mut self, token: Option<i64>) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        self.current.common.write_token = token;
        Ok(())
    }

    /// Mutable access to the location, fuzz factor and payload.
    pub fn edit_data(&mut self) -> Result<&mut DataFields, CoreError> {
        self.ensure_writeable()?;
        let kind = self.kind();
        self.current
            .body
            .data_mut()
            .ok_or(CoreError::WrongKind {
                expected: "data",
                actual: kind,
            })
    }

    pub fn edit_user(&mut self) -> Result<&mut UserFields, CoreError> {
        self.ensure_writeable()?;
        match &mut self.current.body {
            RecordBody::User { user, .. } => Ok(user),
            other => Err(CoreError::WrongKind {
                expected: "user",
                actual: other.kind(),
            }),
        }
    }

    pub fn edit_place(&mut self) -> Result<&mut PlaceFields, CoreError> {
        self.ensure_writeable()?;
        match &mut self.current.body {
            RecordBody::Place { place, .. } => Ok(place),
            other => Err(CoreError::WrongKind {
                expected: "place",
                actual: other.kind(),
            }),
        }
    }

    pub fn edit_thing(&mut self) -> Result<&mut ThingFields, CoreError> {
        self.ensure_writeable()?;
        match &mut self.current.body {
            RecordBody::Thing { thing, .. } => Ok(thing),
            other => Err(CoreError::WrongKind {
                expected: "thing",
                actual: other.kind(),
            }),
        }
    }

    /// Set the login name of a security record.
    pub fn set_login_id(&mut self, login_id: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        let kind = self.kind();
        let security = self
            .current
            .body
            .security_mut()
            .ok_or(CoreError::WrongKind {
                expected: "security",
                actual: kind,
            })?;
        security.login_id = Some(login_id.into());
        Ok(())
    }

    /// Stage a new password for a login. Sent on the next save.
    pub fn set_password(&mut self, password: SecretString) -> Result<(), CoreError> {
        self.ensure_writeable()?;
        match &mut self.current.body {
            RecordBody::Login { login, .. } => {
                login.password = Some(password);
                Ok(())
            }
            other => Err(CoreError::WrongKind {
                expected: "login",
                actual: other.kind(),
            }),
        }
    }

    /// Replace the token set of a security record.
    ///
    /// Only a logged-in manager may do this, and never on their own login.
    /// Token `1` is kept regardless of `tokens`.
    pub fn set_security_tokens(
        &mut self,
        tokens: impl IntoIterator<Item = i64>,
        permissions: &Permissions,
    ) -> Result<(), CoreError> {
        if !permissions.logged_in {
            return Err(CoreError::NotLoggedIn);
        }
        if !permissions.is_manager {
            return Err(CoreError::PermissionDenied {
                message: "only managers can change security tokens".into(),
            });
        }
        if self.kind() == RecordKind::Login && permissions.own_login_id == Some(self.id) {
            return Err(CoreError::PermissionDenied {
                message: "cannot change the tokens of your own login".into(),
            });
        }
        self.ensure_writeable()?;
        let kind = self.kind();
        let security = self
            .current
            .body
            .security_mut()
            .ok_or(CoreError::WrongKind {
                expected: "security",
                actual: kind,
            })?;
        security.replace_tokens(tokens);
        Ok(())
    }

    /// Set which token may see this record's unobfuscated location.
    ///
    /// The caller must hold the token being granted.
    pub fn set_can_see_through_the_fuzz(
        &mut self,
        token: Option<i64>,
        permissions: &Permissions,
    ) -> Result<(), CoreError> {
        if let Some(token) = token.filter(|t| !permissions.holds_token(*t)) {
            return Err(CoreError::PermissionDenied {
                message: format!("you do not hold token {token}"),
            });
        }
        self.edit_data()?.can_see_through_the_fuzz = token;
        Ok(())
    }
}

fn clear_password(fields: &mut Fields) {
    if let RecordBody::Login { login, .. } = &mut fields.body {
        login.password = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::data::Coordinate;

    fn place(id: i64, writeable: bool) -> Record {
        let mut fields = Fields::empty(RecordKind::Place);
        fields.common.name = "Lighthouse".into();
        fields.common.lang = "en".into();
        Record::from_server(id, writeable, None, fields)
    }

    fn manager(own_login_id: i64) -> Permissions {
        Permissions {
            logged_in: true,
            is_manager: true,
            own_login_id: Some(own_login_id),
            tokens: BTreeSet::from([1, 4]),
        }
    }

    #[test]
    fn fresh_server_record_is_clean() {
        let record = place(2, true);
        assert!(!record.is_dirty());
        assert_eq!(record.key(), RecordKey::data(2));
    }

    #[test]
    fn new_record_is_always_dirty() {
        let mut record = Record::new(RecordKind::Thing);
        assert!(record.is_dirty());
        record.revert();
        assert!(record.is_dirty());
    }

    #[test]
    fn revert_clears_dirty() {
        let mut record = place(2, true);
        record.set_name("Harbour").unwrap();
        record.edit_place().unwrap().address.town = Some("Brest".into());
        assert!(record.is_dirty());

        record.revert();
        assert!(!record.is_dirty());
        assert_eq!(record.name(), "Lighthouse");
    }

    #[test]
    fn read_only_record_rejects_writes() {
        let mut record = place(2, false);
        assert!(matches!(
            record.set_name("nope"),
            Err(CoreError::NotWriteable { id: 2 })
        ));
        assert!(record.edit_data().is_err());
        assert!(!record.is_dirty());
    }

    #[test]
    fn wrong_variant_editor_is_rejected() {
        let mut record = place(2, true);
        assert!(matches!(
            record.edit_thing(),
            Err(CoreError::WrongKind {
                expected: "thing",
                actual: RecordKind::Place
            })
        ));
    }

    #[test]
    fn token_rules() {
        let mut login = Record::from_server(7, true, None, Fields::empty(RecordKind::Login));

        let not_manager = Permissions {
            logged_in: true,
            ..Permissions::default()
        };
        assert!(matches!(
            login.set_security_tokens([3], &not_manager),
            Err(CoreError::PermissionDenied { .. })
        ));
        assert!(matches!(
            login.set_security_tokens([3], &Permissions::default()),
            Err(CoreError::NotLoggedIn)
        ));
        assert!(matches!(
            login.set_security_tokens([3], &manager(7)),
            Err(CoreError::PermissionDenied { .. })
        ));

        login.set_security_tokens([3, 9], &manager(1)).unwrap();
        assert_eq!(login.security().unwrap().security_tokens(), vec![1, 3, 9]);
        login.set_security_tokens([], &manager(1)).unwrap();
        assert_eq!(login.security().unwrap().security_tokens(), vec![1]);
    }

    #[test]
    fn fuzz_visibility_requires_held_token() {
        let mut record = place(2, true);
        assert!(matches!(
            record.set_can_see_through_the_fuzz(Some(5), &manager(1)),
            Err(CoreError::PermissionDenied { .. })
        ));
        record.set_can_see_through_the_fuzz(Some(4), &manager(1)).unwrap();
        assert_eq!(record.data().unwrap().can_see_through_the_fuzz(), Some(4));
    }

    #[test]
    fn changed_parameters_lists_only_differences() {
        let mut record = place(2, true);
        record
            .edit_data()
            .unwrap()
            .set_coords(Some(Coordinate::new(48.4, -4.5)));
        record.edit_place().unwrap().address.town = Some("Brest".into());

        assert_eq!(
            record.changed_parameters(),
            vec![
                ("latitude".to_string(), "48.4".to_string()),
                ("longitude".to_string(), "-4.5".to_string()),
                ("town".to_string(), "Brest".to_string()),
            ]
        );
    }

    #[test]
    fn cleared_value_is_sent_empty() {
        let mut fields = Fields::empty(RecordKind::Thing);
        if let RecordBody::Thing { thing, .. } = &mut fields.body {
            thing.description = Some("old".into());
        }
        let mut record = Record::from_server(3, true, None, fields);
        record.edit_thing().unwrap().description = None;
        assert_eq!(
            record.changed_parameters(),
            vec![("description".to_string(), String::new())]
        );
    }

    #[test]
    fn commit_clears_password_and_dirty() {
        let mut login = Record::from_server(7, true, None, Fields::empty(RecordKind::Login));
        login
            .set_password(SecretString::from("hunter2".to_string()))
            .unwrap();
        assert!(login.login().unwrap().has_pending_password());
        assert!(
            login
                .changed_parameters()
                .contains(&("password".to_string(), "hunter2".to_string()))
        );

        let sent = login.fields().clone();
        login.commit(sent);
        assert!(!login.is_dirty());
        assert!(!login.login().unwrap().has_pending_password());
    }
}
