// ── Record kinds and identity ──
//
// A record's identity is its integer id scoped to one of the two logical
// databases. `RecordKey` is the handle callers hold; its ordering is the
// cache's iteration order.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The logical sub-database a record lives in.
///
/// Variant order matters: `Security` sorts before `Data`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Database {
    Security,
    Data,
}

/// The concrete resource type of a record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum RecordKind {
    #[strum(to_string = "login", serialize = "logins")]
    Login,
    #[strum(to_string = "security_token", serialize = "token", serialize = "tokens")]
    SecurityToken,
    #[strum(to_string = "user", serialize = "person", serialize = "people")]
    User,
    #[strum(to_string = "place", serialize = "places")]
    Place,
    #[strum(to_string = "thing", serialize = "things")]
    Thing,
}

impl RecordKind {
    /// Which database records of this kind belong to.
    pub fn database(self) -> Database {
        match self {
            Self::Login | Self::SecurityToken => Database::Security,
            Self::User | Self::Place | Self::Thing => Database::Data,
        }
    }

    /// The plugin path under `/json/` that serves this kind.
    pub fn plugin_path(self) -> &'static str {
        match self {
            Self::Login => "people/logins",
            Self::SecurityToken => "people/tokens",
            Self::User => "people/people",
            Self::Place => "places",
            Self::Thing => "things",
        }
    }

    /// The container key under which the server lists records of this kind.
    pub fn context_name(self) -> &'static str {
        match self {
            Self::Login => "logins",
            Self::SecurityToken => "tokens",
            Self::User => "people",
            Self::Place => "places",
            Self::Thing => "things",
        }
    }

    /// Map a parent-context key from a response tree to the kind it holds.
    ///
    /// Logins are recognised by their `login_id` field instead, so
    /// `"logins"` is deliberately absent.
    pub fn from_context(context: &str) -> Option<Self> {
        match context {
            "my_info" | "people" => Some(Self::User),
            "places" => Some(Self::Place),
            "things" => Some(Self::Thing),
            "tokens" => Some(Self::SecurityToken),
            _ => None,
        }
    }

    /// Map a key of the baseline handler mapping to a kind.
    pub fn from_baseline_key(key: &str) -> Option<Self> {
        match key {
            "people" => Some(Self::User),
            "places" => Some(Self::Place),
            "things" => Some(Self::Thing),
            _ => None,
        }
    }

    pub fn is_security(self) -> bool {
        self.database() == Database::Security
    }
}

/// Handle to a cached record: its id within one database.
///
/// Ordered by ascending id, security before data on ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: i64,
    pub database: Database,
}

impl RecordKey {
    pub fn new(id: i64, database: Database) -> Self {
        Self { id, database }
    }

    pub fn security(id: i64) -> Self {
        Self::new(id, Database::Security)
    }

    pub fn data(id: i64) -> Self {
        Self::new(id, Database::Data)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.database, self.id)
    }
}
