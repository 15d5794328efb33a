// ── Session state ──
//
// What the SDK knows about its server connection and login. The API key
// itself lives in the HTTP client; everything else is here.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::model::RecordKey;

/// Connection lifecycle, observable through [`Sdk::connection_state`](crate::Sdk::connection_state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    /// Fetching the plugin list; no authentication involved.
    ProbingServer,
    /// Plugins known, not logged in.
    Connected,
    LoggingIn,
    /// Fetching the session's own login and user records.
    FetchingOwnIdentity,
    LoggedIn,
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    /// Non-empty exactly when the server connection is valid.
    pub(crate) plugins: Vec<String>,
    pub(crate) server_info: Option<Value>,
    pub(crate) login_time: Option<Instant>,
    pub(crate) login_timeout: Option<Duration>,
    pub(crate) my_login: Option<RecordKey>,
    pub(crate) my_user: Option<RecordKey>,
}

impl Session {
    pub(crate) fn is_valid(&self) -> bool {
        !self.plugins.is_empty()
    }

    /// Whether the login clock is still running. Evaluated on every call;
    /// nothing expires in the background.
    pub(crate) fn login_current(&self) -> bool {
        match (self.login_time, self.login_timeout) {
            (Some(at), Some(timeout)) => at.elapsed() <= timeout,
            _ => false,
        }
    }

    pub(crate) fn start_login(&mut self, timeout: Duration) {
        self.login_time = Some(Instant::now());
        self.login_timeout = Some(timeout);
    }

    /// Forget everything tied to the current login.
    pub(crate) fn clear_login(&mut self) {
        self.login_time = None;
        self.login_timeout = None;
        self.my_login = None;
        self.my_user = None;
    }

    /// Forget the server connection. Login state is left alone.
    pub(crate) fn invalidate(&mut self) {
        self.plugins.clear();
        self.server_info = None;
    }
}
