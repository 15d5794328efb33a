// ── SDK facade ──
//
// Session lifecycle, the request orchestrator, and record access behind
// one cheaply cloneable handle. Fetches return at once and report through
// the event channel; every request holds an operation slot until its
// response has been merged into the cache.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use baobab_api::{BaobabClient, TlsMode, TransportConfig};
use bytes::Bytes;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::{SdkConfig, TlsVerification};
use crate::error::CoreError;
use crate::event::SdkEvent;
use crate::model::{Coordinate, Fields, Permissions, Record, RecordKey, RecordKind};
use crate::operation::OperationCounter;
use crate::parse::{collect_changes, parse_baseline, parse_records, parse_records_in};
use crate::session::{ConnectionState, Session};
use crate::store::RecordCache;

/// Most IDs sent in one request.
pub const CHUNK_SIZE: usize = 10;

/// Events buffered per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_SIZE: usize = 256;

/// Parent context the `my_info` endpoints imply for a bare record.
const MY_INFO_CONTEXT: &str = "my_info";

/// Client-side handle to one BAOBAB server.
///
/// Cheaply cloneable via `Arc<SdkInner>`. Owns the record cache: every
/// record is held once and addressed by [`RecordKey`].
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<SdkInner>,
}

struct SdkInner {
    config: SdkConfig,
    client: BaobabClient,
    cache: RecordCache,
    session: RwLock<Session>,
    search_center: RwLock<Option<Coordinate>>,
    counter: Arc<OperationCounter>,
    event_tx: broadcast::Sender<SdkEvent>,
    connection_state: watch::Sender<ConnectionState>,
}

/// A save, captured from the record before the request goes out.
struct PendingSave {
    kind: RecordKind,
    id: i64,
    params: Vec<(String, String)>,
    sent: Fields,
}

impl Sdk {
    /// Create an SDK from configuration. Does not touch the network; call
    /// [`connect`](Self::connect) next.
    pub fn new(config: SdkConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = BaobabClient::new(
            config.url.clone(),
            config.server_secret.clone(),
            &transport,
        )?;
        Ok(Self::from_client(config, client))
    }

    /// Create an SDK around a caller-supplied `reqwest::Client`.
    pub fn with_http_client(config: SdkConfig, http: reqwest::Client) -> Self {
        let client =
            BaobabClient::with_client(http, config.url.clone(), config.server_secret.clone());
        Self::from_client(config, client)
    }

    fn from_client(config: SdkConfig, client: BaobabClient) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(SdkInner {
                config,
                client,
                cache: RecordCache::new(),
                session: RwLock::new(Session::default()),
                search_center: RwLock::new(None),
                counter: OperationCounter::new(event_tx.clone()),
                event_tx,
                connection_state,
            }),
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    /// The record cache.
    pub fn cache(&self) -> &RecordCache {
        &self.inner.cache
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Probe the server and, when the configuration carries a login
    /// triple, log in.
    ///
    /// A partial login triple is rejected before any request is made.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let credentials = self
            .inner
            .config
            .login_credentials()
            .map_err(|e| self.reject(e))?;

        self.set_state(ConnectionState::ProbingServer);
        info!(url = %self.inner.client.base_url(), "probing server");

        let body = match self.inner.client.baseline().await {
            Ok(body) => body,
            Err(e) => {
                let err = CoreError::from(e);
                self.invalidate(Some(err.clone()));
                return Err(err);
            }
        };

        let outcome = parse_baseline(&body);
        for err in outcome.errors {
            self.report(err);
        }
        if outcome.info.plugins.is_empty() {
            let err = CoreError::data("server lists no plugins", Some(body));
            self.invalidate(Some(err.clone()));
            return Err(err);
        }
        debug!(plugins = ?outcome.info.plugins, "server is valid");
        {
            let mut session = self.session_mut();
            session.plugins = outcome.info.plugins;
            session.server_info = outcome.info.server_info;
        }
        self.set_state(ConnectionState::Connected);

        match credentials {
            Some(creds) => {
                self.login(&creds.login_id, &creds.password, creds.timeout)
                    .await
            }
            None => {
                self.report_ready();
                Ok(())
            }
        }
    }

    /// Log in and load the session's own login and user records.
    ///
    /// The login stays valid for `timeout` after it succeeds.
    pub async fn login(
        &self,
        login_id: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        if login_id.is_empty() || timeout.is_zero() {
            return Err(self.reject(CoreError::InvalidParameters {
                message: "login requires a login id, a password and a positive timeout".into(),
            }));
        }
        if !self.is_valid() {
            return Err(self.reject(CoreError::NotConnected));
        }

        self.set_state(ConnectionState::LoggingIn);
        if let Err(e) = self.inner.client.login(login_id, password).await {
            return Err(self.login_failed(e.into()));
        }
        self.session_mut().start_login(timeout);

        self.set_state(ConnectionState::FetchingOwnIdentity);
        if let Err(e) = self.fetch_own_identity().await {
            self.inner.client.clear_api_key();
            self.session_mut().clear_login();
            return Err(self.login_failed(e));
        }

        self.set_state(ConnectionState::LoggedIn);
        info!(login_id, "logged in");
        self.report_ready();
        Ok(())
    }

    async fn fetch_own_identity(&self) -> Result<(), CoreError> {
        let body = self.inner.client.my_login_info().await?;
        let login_key = self
            .absorb_one(&body, RecordKind::Login)
            .ok_or_else(|| CoreError::data("login info holds no login record", Some(body)))?;

        let user_key = match self.inner.client.my_user_info().await? {
            Some(body) => self.absorb_one(&body, RecordKind::User),
            None => {
                debug!("login has no associated user");
                None
            }
        };

        let mut session = self.session_mut();
        session.my_login = Some(login_key);
        session.my_user = user_key;
        Ok(())
    }

    /// Parse a `my_info` body and cache its first record of `kind`.
    fn absorb_one(&self, body: &Bytes, kind: RecordKind) -> Option<RecordKey> {
        let outcome = parse_records_in(body, Some(MY_INFO_CONTEXT));
        for err in outcome.errors {
            self.report(err);
        }
        let record = outcome.records.into_iter().find(|r| r.kind() == kind)?;
        Some(self.inner.cache.merge(record))
    }

    fn login_failed(&self, err: CoreError) -> CoreError {
        warn!(error = %err, "login failed");
        self.report(err.clone());
        self.set_state(ConnectionState::Connected);
        self.report_ready();
        err
    }

    /// End the session.
    ///
    /// The API key, the login clock, the own login/user records and the
    /// whole record cache are dropped whatever the server answers. The
    /// HTTP client is kept.
    pub async fn logout(&self) -> Result<(), CoreError> {
        if !self.is_logged_in() {
            return Err(self.reject(CoreError::NotLoggedIn));
        }

        let result = self.inner.client.logout().await;
        self.inner.client.clear_api_key();
        self.session_mut().clear_login();
        self.inner.cache.clear();
        self.set_state(if self.is_valid() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        });
        self.emit(SdkEvent::LoginValid(false));
        info!("logged out");

        result.map_err(|e| self.reject(e.into()))
    }

    /// Mark the server connection unusable.
    ///
    /// Clears the plugin list, reports `error` if given, and emits
    /// [`SdkEvent::Disconnected`].
    pub fn invalidate(&self, error: Option<CoreError>) {
        self.session_mut().invalidate();
        if let Some(err) = error {
            self.report(err);
        }
        warn!("{}", CoreError::ServerConnectionInvalid);
        self.set_state(ConnectionState::Disconnected);
        self.emit(SdkEvent::Disconnected);
    }

    /// Report connection validity, then login validity.
    pub fn report_ready(&self) {
        self.emit(SdkEvent::ConnectionValid(self.is_valid()));
        self.emit(SdkEvent::LoginValid(self.is_logged_in()));
    }

    /// Whether the server answered the baseline probe with a plugin list.
    pub fn is_valid(&self) -> bool {
        self.session().is_valid()
    }

    /// Whether an API key is held and the login has not timed out.
    pub fn is_logged_in(&self) -> bool {
        self.inner.client.has_api_key() && self.session().login_current()
    }

    /// Plugin paths the server exposes.
    pub fn plugins(&self) -> Vec<String> {
        self.session().plugins.clone()
    }

    /// The `serverinfo` block of the baseline response, if any.
    pub fn server_info(&self) -> Option<Value> {
        self.session().server_info.clone()
    }

    pub fn my_login(&self) -> Option<Record> {
        let key = self.session().my_login?;
        self.inner.cache.get(&key)
    }

    pub fn my_user(&self) -> Option<Record> {
        let key = self.session().my_user?;
        self.inner.cache.get(&key)
    }

    /// What the current login may do. Pass it to permission-checked
    /// record setters.
    pub fn permissions(&self) -> Permissions {
        let logged_in = self.is_logged_in();
        match self.my_login() {
            Some(login) => Permissions {
                logged_in,
                is_manager: login.login().is_some_and(|l| l.is_manager()),
                own_login_id: Some(login.id()),
                tokens: login
                    .security()
                    .map(|s| s.security_tokens().into_iter().collect())
                    .unwrap_or_default(),
            },
            None => Permissions {
                logged_in,
                ..Permissions::default()
            },
        }
    }

    // ── Location ─────────────────────────────────────────────────

    /// Set the point computed distances are measured from.
    pub fn set_search_center(&self, center: Option<Coordinate>) {
        *self
            .inner
            .search_center
            .write()
            .unwrap_or_else(PoisonError::into_inner) = center;
    }

    pub fn search_center(&self) -> Option<Coordinate> {
        *self
            .inner
            .search_center
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Distance to a cached data record in kilometers.
    pub fn distance(&self, key: &RecordKey) -> Option<f64> {
        let center = self.search_center();
        self.inner
            .cache
            .with(key, |r| r.data().and_then(|d| d.distance(center)))
            .flatten()
    }

    // ── Fetches ──────────────────────────────────────────────────

    /// Fetch records of `kind` by integer ID.
    ///
    /// Cached records are delivered at once as one [`SdkEvent::Records`];
    /// the rest are requested in chunks of [`CHUNK_SIZE`].
    pub fn fetch_records(&self, kind: RecordKind, ids: &[i64]) -> Result<(), CoreError> {
        self.require_login()?;
        self.fetch_ids(kind, ids);
        Ok(())
    }

    /// Fetch login records by integer ID.
    pub fn fetch_security_records(&self, ids: &[i64]) -> Result<(), CoreError> {
        self.fetch_records(RecordKind::Login, ids)
    }

    /// Fetch login records by login name.
    pub fn fetch_security_records_by_login_id(
        &self,
        login_ids: &[String],
    ) -> Result<(), CoreError> {
        self.require_login()?;
        let (cached, missing) =
            self.partition(login_ids, |name| self.inner.cache.key_for_login_id(name));
        self.deliver_cached(cached);
        self.spawn_chunks(&missing, |sdk, chunk| async move {
            let result = sdk.inner.client.fetch_logins_by_login_id(&chunk).await;
            sdk.absorb(result);
        });
        Ok(())
    }

    /// Fetch things by their string key.
    pub fn fetch_things_by_key(&self, keys: &[String]) -> Result<(), CoreError> {
        self.require_login()?;
        let (cached, missing) = self.partition(keys, |k| self.inner.cache.key_for_thing(k));
        self.deliver_cached(cached);
        self.spawn_chunks(&missing, |sdk, chunk| async move {
            let result = sdk.inner.client.fetch_things_by_key(&chunk).await;
            sdk.absorb(result);
        });
        Ok(())
    }

    /// Fetch data records without knowing their kind.
    ///
    /// Uncached IDs are first resolved to their owning kind, then fetched
    /// per kind. The resolver request keeps its operation slot until the
    /// typed fetches are dispatched.
    pub fn fetch_baseline_records(&self, ids: &[i64]) -> Result<(), CoreError> {
        self.require_login()?;
        let (cached, missing) = self.partition(ids, |id| {
            let key = RecordKey::data(*id);
            self.inner.cache.contains(&key).then_some(key)
        });
        self.deliver_cached(cached);
        self.spawn_chunks(&missing, |sdk, chunk| async move {
            match sdk.inner.client.resolve_handlers(&chunk).await {
                Ok(body) => {
                    let outcome = parse_baseline(&body);
                    for err in outcome.errors {
                        sdk.report(err);
                    }
                    for (kind, ids) in outcome.info.handlers {
                        debug!(%kind, count = ids.len(), "resolved baseline ids");
                        sdk.fetch_ids(kind, &ids);
                    }
                }
                Err(e) => sdk.report(e.into()),
            }
        });
        Ok(())
    }

    /// Find records of a data kind within `radius_km` of `center`.
    pub fn search_by_location(
        &self,
        kind: RecordKind,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<(), CoreError> {
        self.require_login()?;
        if kind.is_security() {
            return Err(self.reject(CoreError::InvalidParameters {
                message: format!("{kind} records have no location"),
            }));
        }
        if radius_km.is_nan() || radius_km <= 0.0 {
            return Err(self.reject(CoreError::InvalidParameters {
                message: format!("search radius must be positive, got {radius_km}"),
            }));
        }

        let guard = self.inner.counter.begin();
        let sdk = self.clone();
        tokio::spawn(async move {
            let result = sdk
                .inner
                .client
                .search_by_location(
                    kind.plugin_path(),
                    center.latitude,
                    center.longitude,
                    radius_km,
                )
                .await;
            sdk.absorb(result);
            drop(guard);
        });
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Send a cached record's local edits to the server.
    ///
    /// On success the record becomes clean, any before/after pairs in the
    /// response are appended to its history, and [`SdkEvent::Saved`]
    /// fires. A clean record sends nothing.
    pub fn save(&self, key: RecordKey) -> Result<(), CoreError> {
        self.require_login()?;

        let pending = self.inner.cache.with(&key, |r| {
            if !r.is_writeable() {
                return Err(CoreError::NotWriteable { id: r.id() });
            }
            if !r.is_dirty() {
                return Ok(None);
            }
            Ok(Some(PendingSave {
                kind: r.kind(),
                id: r.id(),
                params: r.changed_parameters(),
                sent: r.fields().clone(),
            }))
        });
        let pending = match pending {
            Some(Ok(pending)) => pending,
            Some(Err(err)) => return Err(self.reject(err)),
            None => return Err(self.reject(CoreError::RecordNotFound { key })),
        };
        let Some(pending) = pending else {
            debug!(%key, "nothing to save");
            drop(self.inner.counter.begin());
            return Ok(());
        };

        let guard = self.inner.counter.begin();
        let sdk = self.clone();
        tokio::spawn(async move {
            let result = sdk
                .inner
                .client
                .put_record(pending.kind.plugin_path(), pending.id, &pending.params)
                .await;
            match result {
                Ok(body) => sdk.apply_save(key, pending.kind, pending.sent, &body),
                Err(e) => sdk.report(e.into()),
            }
            drop(guard);
        });
        Ok(())
    }

    fn apply_save(&self, key: RecordKey, kind: RecordKind, sent: Fields, body: &Bytes) {
        let changes = match serde_json::from_slice::<Value>(body) {
            Ok(value) => collect_changes(&value, kind),
            Err(e) => {
                if !body.is_empty() {
                    self.report(CoreError::data(
                        format!("save response is not JSON: {e}"),
                        Some(body.clone()),
                    ));
                }
                Vec::new()
            }
        };
        let count = changes.len();
        self.inner.cache.update(&key, move |record| {
            record.commit(sent);
            for change in changes {
                record.push_history(change);
            }
        });
        debug!(%key, changes = count, "record saved");
        self.emit(SdkEvent::Saved(key));
    }

    /// Create a new record on the server.
    ///
    /// `record` must be new (id `0`) and named. The server's copy, with
    /// its assigned id, is cached and announced by [`SdkEvent::Created`].
    pub fn create(&self, record: Record) -> Result<(), CoreError> {
        self.require_login()?;
        if !record.is_new() {
            return Err(self.reject(CoreError::InvalidParameters {
                message: format!("record {} already exists; save it instead", record.id()),
            }));
        }
        if record.name().is_empty() {
            return Err(self.reject(CoreError::InvalidParameters {
                message: "a new record needs a name".into(),
            }));
        }

        let kind = record.kind();
        let params = record.changed_parameters();
        let guard = self.inner.counter.begin();
        let sdk = self.clone();
        tokio::spawn(async move {
            match sdk.inner.client.post_record(kind.plugin_path(), &params).await {
                Ok(body) => sdk.apply_create(kind, &body),
                Err(e) => sdk.report(e.into()),
            }
            drop(guard);
        });
        Ok(())
    }

    fn apply_create(&self, kind: RecordKind, body: &Bytes) {
        let outcome = parse_records(body);
        for err in outcome.errors {
            self.report(err);
        }
        match outcome.records.into_iter().find(|r| r.kind() == kind) {
            Some(created) => {
                let key = self.inner.cache.merge(created);
                info!(%key, "record created");
                self.emit(SdkEvent::Created(key));
                self.emit(SdkEvent::Records(vec![key]));
            }
            None => self.report(CoreError::data(
                format!("create response holds no {kind} record"),
                Some(body.clone()),
            )),
        }
    }

    // ── Record access ────────────────────────────────────────────

    /// A snapshot of a cached record.
    pub fn record(&self, key: &RecordKey) -> Option<Record> {
        self.inner.cache.get(key)
    }

    /// Borrow a cached record for the duration of `f`.
    pub fn with_record<R>(&self, key: &RecordKey, f: impl FnOnce(&Record) -> R) -> Option<R> {
        self.inner.cache.with(key, f)
    }

    /// Edit a cached record in place.
    pub fn update<R>(
        &self,
        key: &RecordKey,
        f: impl FnOnce(&mut Record) -> R,
    ) -> Result<R, CoreError> {
        self.inner
            .cache
            .update(key, f)
            .ok_or_else(|| self.reject(CoreError::RecordNotFound { key: *key }))
    }

    /// Every cached handle, in cache order.
    pub fn cached_keys(&self) -> Vec<RecordKey> {
        self.inner.cache.keys()
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to SDK events.
    ///
    /// Each event is sent once. The channel holds [`EVENT_CHANNEL_SIZE`]
    /// events per receiver; a receiver that falls further behind gets
    /// [`RecvError::Lagged`](tokio::sync::broadcast::error::RecvError::Lagged)
    /// and the skipped events, errors included, are gone for it. Drain the
    /// receiver promptly while a large fetch is in flight.
    pub fn events(&self) -> broadcast::Receiver<SdkEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Requests currently in flight.
    pub fn open_operations(&self) -> usize {
        self.inner.counter.open()
    }

    // ── Orchestration helpers ────────────────────────────────────

    /// Split requested items into cached handles and sorted, de-duplicated
    /// misses.
    fn partition<T: Ord + Clone>(
        &self,
        requested: &[T],
        lookup: impl Fn(&T) -> Option<RecordKey>,
    ) -> (Vec<RecordKey>, Vec<T>) {
        let mut cached = Vec::new();
        let mut missing = Vec::new();
        for item in requested {
            match lookup(item) {
                Some(key) if !cached.contains(&key) => cached.push(key),
                Some(_) => {}
                None => missing.push(item.clone()),
            }
        }
        missing.sort();
        missing.dedup();
        (cached, missing)
    }

    fn deliver_cached(&self, cached: Vec<RecordKey>) {
        if !cached.is_empty() {
            debug!(count = cached.len(), "delivering cached records");
            self.emit(SdkEvent::Records(cached));
        }
    }

    /// Partition `ids`, deliver hits, request the rest.
    fn fetch_ids(&self, kind: RecordKind, ids: &[i64]) {
        let database = kind.database();
        let (cached, missing) = self.partition(ids, |id| {
            let key = RecordKey::new(*id, database);
            self.inner.cache.contains(&key).then_some(key)
        });
        self.deliver_cached(cached);
        self.spawn_chunks(&missing, move |sdk, chunk| async move {
            let result = sdk.inner.client.fetch_by_ids(kind.plugin_path(), &chunk).await;
            sdk.absorb(result);
        });
    }

    /// Run `fetch` once per chunk of `items`, each holding an operation
    /// slot. With nothing to fetch, a slot is opened and closed so the
    /// call still completes.
    fn spawn_chunks<T, F, Fut>(&self, items: &[T], fetch: F)
    where
        T: Clone,
        F: Fn(Sdk, Vec<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if items.is_empty() {
            drop(self.inner.counter.begin());
            return;
        }
        for chunk in items.chunks(CHUNK_SIZE) {
            let guard = self.inner.counter.begin();
            let task = fetch(self.clone(), chunk.to_vec());
            tokio::spawn(async move {
                task.await;
                drop(guard);
            });
        }
    }

    /// Parse a record-tree response into the cache and announce it.
    fn absorb(&self, result: Result<Bytes, baobab_api::Error>) {
        match result {
            Ok(body) => {
                let outcome = parse_records(&body);
                let keys = self.inner.cache.merge_all(outcome.records);
                for err in outcome.errors {
                    self.report(err);
                }
                if !keys.is_empty() {
                    self.emit(SdkEvent::Records(keys));
                }
            }
            Err(e) => self.report(e.into()),
        }
    }

    fn require_login(&self) -> Result<(), CoreError> {
        if !self.is_valid() {
            return Err(self.reject(CoreError::NotConnected));
        }
        if !self.is_logged_in() {
            return Err(self.reject(CoreError::NotLoggedIn));
        }
        Ok(())
    }

    fn emit(&self, event: SdkEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(event);
    }

    fn report(&self, err: CoreError) {
        warn!(category = %err.category(), error = %err, "reporting error");
        self.emit(SdkEvent::error(err));
    }

    /// Report an operational error and hand it back for the caller.
    fn reject(&self, err: CoreError) -> CoreError {
        self.report(err.clone());
        err
    }

    fn set_state(&self, state: ConnectionState) {
        debug!(%state, "connection state");
        self.inner.connection_state.send_replace(state);
    }

    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_transport(config: &SdkConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
