// BAOBAB HTTP client
//
// Wraps `reqwest::Client` with BAOBAB URL construction, query-parameter
// credentials, and status checking. Endpoint groups (auth, record
// fetches, saves) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use bytes::Bytes;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Query parameter carrying the shared server secret.
pub const SERVER_SECRET_PARAM: &str = "login_server_secret";
/// Query parameter carrying the per-session API key.
pub const API_KEY_PARAM: &str = "login_api_key";

/// Raw HTTP client for a BAOBAB server.
///
/// Credentials never travel in headers or bodies: the shared server secret
/// and the session API key are appended as query parameters on every
/// authenticated call. All fetch methods return the raw response body;
/// turning it into records is the caller's job.
pub struct BaobabClient {
    http: reqwest::Client,
    base_url: Url,
    server_secret: SecretString,
    /// Session API key. Set by a successful login, cleared on logout.
    api_key: RwLock<Option<SecretString>>,
}

impl BaobabClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `https://example.org/baobab/`).
    pub fn new(
        base_url: Url,
        server_secret: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, server_secret))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, server_secret: SecretString) -> Self {
        Self {
            http,
            base_url,
            server_secret,
            api_key: RwLock::new(None),
        }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── API key management ───────────────────────────────────────────

    /// Whether a session API key is currently held.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set_api_key(&self, key: SecretString) {
        debug!("storing session API key");
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    /// Forget the session API key.
    pub fn clear_api_key(&self) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a URL by appending static path segments to the base URL.
    ///
    /// Each element of `segments` may itself contain `/`; it is split so
    /// that plugin paths like `people/logins` can be passed whole. An empty
    /// final segment produces a trailing slash. Never pass caller data
    /// here; use [`resource_url`](Self::resource_url) for that.
    pub(crate) fn endpoint_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::UnusableBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/'));
            }
        }
        Ok(url)
    }

    /// Like [`endpoint_url`](Self::endpoint_url), then append `item` as a
    /// single segment. A `/` inside `item` is percent-encoded.
    pub(crate) fn resource_url(&self, segments: &[&str], item: &str) -> Result<Url, Error> {
        let mut url = self.endpoint_url(segments)?;
        url.path_segments_mut()
            .map_err(|()| Error::UnusableBaseUrl(self.base_url.to_string()))?
            .push(item);
        Ok(url)
    }

    /// Append the server secret and the session API key.
    ///
    /// Fails with [`Error::Authentication`] when no API key is held.
    pub(crate) fn authenticate(&self, url: &mut Url) -> Result<(), Error> {
        let guard = self.api_key.read().unwrap_or_else(PoisonError::into_inner);
        let key = guard.as_ref().ok_or_else(|| Error::Authentication {
            message: "not logged in (no API key)".into(),
        })?;
        url.query_pairs_mut()
            .append_pair(SERVER_SECRET_PARAM, self.server_secret.expose_secret())
            .append_pair(API_KEY_PARAM, key.expose_secret());
        Ok(())
    }

    /// Append credentials when logged in; leave the URL untouched otherwise.
    pub(crate) fn authenticate_if_possible(&self, url: &mut Url) {
        if self.has_api_key() {
            // A logout racing this call leaves the request anonymous.
            let _ = self.authenticate(url);
        }
    }

    /// Append only the shared server secret.
    pub(crate) fn append_server_secret(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair(SERVER_SECRET_PARAM, self.server_secret.expose_secret());
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and return the status and body, whatever the status.
    pub(crate) async fn send(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<(StatusCode, Bytes), Error> {
        // Never log the query string: it carries credentials.
        debug!(%method, path = url.path(), "sending request");
        let resp = self.http.request(method, url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        trace!(status = status.as_u16(), len = body.len(), "response received");
        Ok((status, body))
    }

    /// Send a request and require a 2xx status.
    pub(crate) async fn send_expect_success(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<Bytes, Error> {
        let path = url.path().to_owned();
        let (status, body) = self.send(method, url).await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::HttpStatus {
                status: status.as_u16(),
                url: path,
                body,
            })
        }
    }

    /// `GET` and require a 2xx status.
    pub(crate) async fn get(&self, url: Url) -> Result<Bytes, Error> {
        self.send_expect_success(reqwest::Method::GET, url).await
    }
}
