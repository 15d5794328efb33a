// ── Security-database fields ──
//
// Logins and security tokens share a login id and an ACL token set.

use std::collections::BTreeSet;

use secrecy::{ExposeSecret, SecretString};

/// Token granted to every authenticated user. Always present in a
/// security record's token set.
pub const ANY_AUTHENTICATED_TOKEN: i64 = 1;

/// Fields shared by every security-database record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityFields {
    pub(crate) login_id: Option<String>,
    tokens: BTreeSet<i64>,
}

impl SecurityFields {
    pub fn new(login_id: Option<String>, tokens: impl IntoIterator<Item = i64>) -> Self {
        let mut fields = Self {
            login_id,
            tokens: tokens.into_iter().collect(),
        };
        fields.tokens.insert(ANY_AUTHENTICATED_TOKEN);
        fields
    }

    pub fn login_id(&self) -> Option<&str> {
        self.login_id.as_deref()
    }

    /// The token set in ascending order, always led by token `1`.
    pub fn security_tokens(&self) -> Vec<i64> {
        let mut tokens: Vec<i64> = self
            .tokens
            .iter()
            .copied()
            .filter(|t| *t != ANY_AUTHENTICATED_TOKEN)
            .collect();
        tokens.insert(0, ANY_AUTHENTICATED_TOKEN);
        tokens
    }

    pub fn has_token(&self, token: i64) -> bool {
        token == ANY_AUTHENTICATED_TOKEN || self.tokens.contains(&token)
    }

    pub(crate) fn replace_tokens(&mut self, tokens: impl IntoIterator<Item = i64>) {
        self.tokens = tokens.into_iter().collect();
        self.tokens.insert(ANY_AUTHENTICATED_TOKEN);
    }
}

/// Login-specific fields.
#[derive(Debug, Clone, Default)]
pub struct LoginFields {
    pub(crate) is_manager: bool,
    pub(crate) is_main_admin: bool,
    pub(crate) user_object_id: Option<i64>,
    pub(crate) current_login: bool,
    /// Write-only: set locally, sent on save, never read back.
    pub(crate) password: Option<SecretString>,
}

impl LoginFields {
    pub fn is_manager(&self) -> bool {
        self.is_manager
    }

    pub fn is_main_admin(&self) -> bool {
        self.is_main_admin
    }

    /// ID of the user (data database) associated with this login.
    pub fn user_object_id(&self) -> Option<i64> {
        self.user_object_id
    }

    /// Whether this login belongs to the current session.
    pub fn is_current_login(&self) -> bool {
        self.current_login
    }

    /// Whether a new password is waiting to be saved.
    pub fn has_pending_password(&self) -> bool {
        self.password.is_some()
    }
}

impl PartialEq for LoginFields {
    fn eq(&self, other: &Self) -> bool {
        let passwords_equal = match (&self.password, &other.password) {
            (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
            (None, None) => true,
            _ => false,
        };
        self.is_manager == other.is_manager
            && self.is_main_admin == other.is_main_admin
            && self.user_object_id == other.user_object_id
            && self.current_login == other.current_login
            && passwords_equal
    }
}

/// What the session's own login is allowed to do.
///
/// Derived from the logged-in login record; passed to setters whose
/// permission depends on who is asking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Permissions {
    pub logged_in: bool,
    pub is_manager: bool,
    /// Id of the session's own login record.
    pub own_login_id: Option<i64>,
    /// Tokens the session's own login holds.
    pub tokens: BTreeSet<i64>,
}

impl Permissions {
    pub fn holds_token(&self, token: i64) -> bool {
        self.tokens.contains(&token)
    }
}
