//! The authorization session cache.
//!
//! One `AuthzSession` is built at application start and handed to the
//! routing and view layers by reference. It owns:
//!
//! - the bearer token of the logged-in admin,
//! - the superuser flag, role names and compiled permission set,
//! - a mirror of all four in a `DurableStore` (read only at cold start).
//!
//! Loading is coalesced: concurrent `load_authz` calls for the same identity
//! epoch await one shared fetch. The epoch advances on every login, logout
//! and clear, and any response fetched under an older epoch, or older than
//! a response already applied, is discarded instead of overwriting newer
//! state.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use portcullis_contracts::{
    error::PortcullisResult,
    identity::{LoginRequest, LoginResponse},
    policy::AuthzInfo,
    session::{AuthzSnapshot, LoadOutcome, SessionId, SessionPhase},
};
use portcullis_policy::PermissionSet;

use crate::storage::{
    decode_flag, decode_string_list, encode_flag, encode_string_list, IS_SUPER_KEY,
    PERMISSIONS_KEY, ROLES_KEY, TOKEN_KEY,
};
use crate::traits::{DurableStore, IdentitySource};

type SharedFetch = Shared<BoxFuture<'static, PortcullisResult<AuthzInfo>>>;

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    is_super: bool,
    roles: BTreeSet<String>,
    grants: PermissionSet,
    loaded: bool,
    loaded_at: Option<DateTime<Utc>>,
    /// Identity generation; bumped whenever cached authorization is invalidated.
    epoch: u64,
    /// Sequence number of the fetch whose payload is currently applied.
    applied_seq: u64,
}

struct InflightLoad {
    epoch: u64,
    seq: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct Loads {
    next_seq: u64,
    current: Option<InflightLoad>,
}

/// The process-wide authorization cache for one admin console.
pub struct AuthzSession {
    id: SessionId,
    source: Arc<dyn IdentitySource>,
    store: Arc<dyn DurableStore>,
    state: Mutex<SessionState>,
    loads: Mutex<Loads>,
}

impl AuthzSession {
    /// Create an empty, unauthenticated session.
    ///
    /// Call [`hydrate`](Self::hydrate) to restore what a previous process
    /// persisted.
    pub fn new(source: Arc<dyn IdentitySource>, store: Arc<dyn DurableStore>) -> Self {
        Self {
            id: SessionId::new(),
            source,
            store,
            state: Mutex::new(SessionState::default()),
            loads: Mutex::new(Loads::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Restore token, superuser flag, roles and permission keys from the
    /// durable store.
    ///
    /// Unreadable or corrupt entries read as empty. The session is not
    /// marked loaded: the first guarded navigation still fetches fresh data.
    pub fn hydrate(&self) {
        let token = self.read_key(TOKEN_KEY).filter(|t| !t.is_empty());
        let is_super = decode_flag(self.read_key(IS_SUPER_KEY).as_deref());
        let roles = decode_string_list(self.read_key(ROLES_KEY).as_deref());
        let keys = decode_string_list(self.read_key(PERMISSIONS_KEY).as_deref());

        let mut state = self.state.lock();
        state.epoch += 1;
        state.token = token;
        state.is_super = is_super;
        state.roles = roles.into_iter().collect();
        state.grants = PermissionSet::from_keys(keys);
        state.loaded = false;
        state.loaded_at = None;

        info!(
            session_id = %self.id,
            authenticated = state.token.is_some(),
            is_super = state.is_super,
            grants = state.grants.len(),
            "session hydrated from durable store"
        );
    }

    /// Authenticate with `request`, remember the token, then load
    /// authorization for it.
    ///
    /// A login failure leaves the session untouched. A failure while loading
    /// authorization is returned with the token still set; the navigation
    /// guard turns that into a logout.
    pub async fn login(&self, request: &LoginRequest) -> PortcullisResult<LoginResponse> {
        let response = self.source.login(request).await?;

        {
            let mut state = self.state.lock();
            self.reset_authz(&mut state);
            state.token = Some(response.token.clone());
            self.write_key(TOKEN_KEY, &response.token);
        }

        info!(
            session_id = %self.id,
            admin_id = response.user.id,
            username = %response.user.username,
            "admin logged in"
        );

        self.load_authz().await?;
        Ok(response)
    }

    /// Fetch the current admin's authorization and replace the cache with it.
    ///
    /// Without a token the cache is cleared and `NoCredential` returned.
    /// Remote failures propagate unchanged, unless the session moved to a
    /// new identity while the request was in flight, in which case the
    /// outcome is `Discarded`.
    pub async fn load_authz(&self) -> PortcullisResult<LoadOutcome> {
        let (token, epoch) = {
            let state = self.state.lock();
            (state.token.clone(), state.epoch)
        };

        let Some(token) = token else {
            debug!(session_id = %self.id, "no credential; clearing authorization cache");
            self.clear();
            return Ok(LoadOutcome::NoCredential);
        };

        let (seq, fetch) = self.begin_fetch(epoch, token);
        let result = fetch.await;
        self.finish_fetch(seq);

        match result {
            Ok(info) => Ok(self.apply(epoch, seq, info)),
            Err(err) => {
                if self.state.lock().epoch != epoch {
                    debug!(
                        session_id = %self.id,
                        error = %err,
                        "ignoring failure of a superseded authorization fetch"
                    );
                    return Ok(LoadOutcome::Discarded);
                }
                warn!(session_id = %self.id, error = %err, "authorization load failed");
                Err(err)
            }
        }
    }

    /// Is `required` (an `ACTION:OBJECT` key) permitted?
    ///
    /// No requirement is always permitted. A superuser is always permitted.
    /// Otherwise some granted key must cover the requirement.
    pub fn has_permission(&self, required: Option<&str>) -> bool {
        let Some(required) = required.filter(|r| !r.is_empty()) else {
            return true;
        };

        let state = self.state.lock();
        if state.is_super {
            return true;
        }

        let permitted = state.grants.permits(required);
        if !permitted {
            debug!(session_id = %self.id, permission = %required, "permission denied");
        }
        permitted
    }

    /// Drop all cached authorization (memory and durable store). The token stays.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        self.reset_authz(&mut state);
        info!(session_id = %self.id, "authorization cache cleared");
    }

    /// Forget the token and all cached authorization.
    pub fn logout(&self) {
        let mut state = self.state.lock();
        state.token = None;
        self.remove_key(TOKEN_KEY);
        self.reset_authz(&mut state);
        info!(session_id = %self.id, "admin logged out");
    }

    /// Whether authorization has been fetched during this process.
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().token.is_some()
    }

    /// The current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.state.lock();
        match (&state.token, state.loaded) {
            (None, _) => SessionPhase::Unauthenticated,
            (Some(_), false) => SessionPhase::AuthenticatedUnloaded,
            (Some(_), true) => SessionPhase::AuthenticatedLoaded,
        }
    }

    pub fn snapshot(&self) -> AuthzSnapshot {
        let state = self.state.lock();
        AuthzSnapshot {
            is_super: state.is_super,
            roles: state.roles.clone(),
            permission_keys: state.grants.keys().map(str::to_string).collect(),
            loaded: state.loaded,
            loaded_at: state.loaded_at,
        }
    }

    // ── Loading internals ────────────────────────────────────────────────────

    /// Join the in-flight fetch for `epoch`, or start a new one.
    fn begin_fetch(&self, epoch: u64, token: String) -> (u64, SharedFetch) {
        let mut loads = self.loads.lock();

        if let Some(current) = loads.current.as_ref().filter(|l| l.epoch == epoch) {
            debug!(session_id = %self.id, seq = current.seq, "joining in-flight authorization load");
            return (current.seq, current.fetch.clone());
        }

        loads.next_seq += 1;
        let seq = loads.next_seq;
        let source = Arc::clone(&self.source);
        let fetch = async move { source.authorization_info(&token).await }
            .boxed()
            .shared();

        loads.current = Some(InflightLoad {
            epoch,
            seq,
            fetch: fetch.clone(),
        });

        debug!(session_id = %self.id, seq, epoch, "starting authorization load");
        (seq, fetch)
    }

    fn finish_fetch(&self, seq: u64) {
        let mut loads = self.loads.lock();
        if loads.current.as_ref().is_some_and(|l| l.seq == seq) {
            loads.current = None;
        }
    }

    fn apply(&self, epoch: u64, seq: u64, info: AuthzInfo) -> LoadOutcome {
        let mut state = self.state.lock();

        if state.epoch != epoch || seq < state.applied_seq {
            info!(
                session_id = %self.id,
                seq,
                applied_seq = state.applied_seq,
                "discarding stale authorization response"
            );
            return LoadOutcome::Discarded;
        }
        if seq == state.applied_seq {
            // Another waiter on the same fetch got here first.
            return LoadOutcome::Applied;
        }

        state.is_super = info.is_super;
        state.roles = info.roles.into_iter().collect();
        state.grants = PermissionSet::from_policies(&info.policies);
        state.loaded = true;
        state.loaded_at = Some(Utc::now());
        state.applied_seq = seq;

        self.write_key(IS_SUPER_KEY, encode_flag(state.is_super));
        self.write_key(ROLES_KEY, &encode_string_list(state.roles.iter().map(String::as_str)));
        self.write_key(PERMISSIONS_KEY, &encode_string_list(state.grants.keys()));

        info!(
            session_id = %self.id,
            is_super = state.is_super,
            roles = state.roles.len(),
            grants = state.grants.len(),
            "authorization loaded"
        );
        LoadOutcome::Applied
    }

    fn reset_authz(&self, state: &mut SessionState) {
        state.epoch += 1;
        state.is_super = false;
        state.roles.clear();
        state.grants = PermissionSet::new();
        state.loaded = false;
        state.loaded_at = None;

        self.remove_key(IS_SUPER_KEY);
        self.remove_key(ROLES_KEY);
        self.remove_key(PERMISSIONS_KEY);
    }

    // ── Durable store access ─────────────────────────────────────────────────
    //
    // The store is a secondary mirror: failures are logged and never
    // interrupt the in-memory session.

    fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(session_id = %self.id, key, error = %err, "durable store read failed");
                None
            }
        }
    }

    fn write_key(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(session_id = %self.id, key, error = %err, "durable store write failed");
        }
    }

    fn remove_key(&self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            warn!(session_id = %self.id, key, error = %err, "durable store remove failed");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use portcullis_contracts::{
        error::{PortcullisError, PortcullisResult},
        identity::{AdminUser, LoginRequest, LoginResponse},
        policy::{AuthzInfo, Policy},
        session::{LoadOutcome, SessionPhase},
    };

    use crate::storage::{IS_SUPER_KEY, PERMISSIONS_KEY, ROLES_KEY, TOKEN_KEY};
    use crate::traits::{DurableStore, IdentitySource};

    use super::AuthzSession;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// An identity source returning a configurable payload, optionally held
    /// back until the test releases a permit.
    struct MockSource {
        info: Mutex<PortcullisResult<AuthzInfo>>,
        calls: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockSource {
        fn new(info: AuthzInfo) -> Self {
            Self {
                info: Mutex::new(Ok(info)),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(info: AuthzInfo, gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(info)
            }
        }

        fn failing(err: PortcullisError) -> Self {
            Self {
                info: Mutex::new(Err(err)),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentitySource for MockSource {
        async fn login(&self, request: &LoginRequest) -> PortcullisResult<LoginResponse> {
            if request.password != "secret" {
                return Err(PortcullisError::InvalidCredentials {
                    reason: "bad password".to_string(),
                });
            }
            Ok(LoginResponse {
                token: format!("token-{}", request.username),
                user: AdminUser {
                    id: 1,
                    username: request.username.clone(),
                },
                expires_at: String::new(),
            })
        }

        async fn authorization_info(&self, _token: &str) -> PortcullisResult<AuthzInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            self.info.lock().clone()
        }
    }

    #[derive(Default)]
    struct MockStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MockStore {
        fn with(entries: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (k, v) in entries {
                store.values.lock().insert(k.to_string(), v.to_string());
            }
            store
        }

        fn value(&self, key: &str) -> Option<String> {
            self.values.lock().get(key).cloned()
        }
    }

    impl DurableStore for MockStore {
        fn get(&self, key: &str) -> PortcullisResult<Option<String>> {
            Ok(self.values.lock().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> PortcullisResult<()> {
            self.values.lock().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> PortcullisResult<()> {
            self.values.lock().remove(key);
            Ok(())
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    impl DurableStore for BrokenStore {
        fn get(&self, _key: &str) -> PortcullisResult<Option<String>> {
            Err(PortcullisError::Storage {
                reason: "unreadable".to_string(),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> PortcullisResult<()> {
            Err(PortcullisError::Storage {
                reason: "read-only".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> PortcullisResult<()> {
            Err(PortcullisError::Storage {
                reason: "read-only".to_string(),
            })
        }
    }

    fn operator_info() -> AuthzInfo {
        AuthzInfo {
            admin_id: Some(1),
            is_super: false,
            roles: vec!["operator".to_string()],
            policies: vec![
                Policy::new("operator", "/api/v1/admin/users", "GET"),
                Policy::new("operator", "/admin/users/:id", "get"),
                Policy::new("operator", "/admin/users", "GET"),
            ],
        }
    }

    fn super_info() -> AuthzInfo {
        AuthzInfo {
            admin_id: Some(2),
            is_super: true,
            roles: vec!["super".to_string()],
            policies: vec![],
        }
    }

    fn session(source: Arc<MockSource>, store: Arc<MockStore>) -> AuthzSession {
        AuthzSession::new(source, store)
    }

    // ── Permission checks ────────────────────────────────────────────────────

    #[tokio::test]
    async fn no_requirement_is_always_permitted() {
        let s = session(
            Arc::new(MockSource::new(AuthzInfo::default())),
            Arc::new(MockStore::default()),
        );
        assert!(s.has_permission(None));
        assert!(s.has_permission(Some("")));
        assert!(!s.has_permission(Some("GET:/admin/users")));
    }

    #[tokio::test]
    async fn login_loads_and_persists_authorization() {
        let source = Arc::new(MockSource::new(operator_info()));
        let store = Arc::new(MockStore::default());
        let s = session(source.clone(), store.clone());

        let resp = s.login(&LoginRequest::new("ops", "secret")).await.unwrap();
        assert_eq!(resp.token, "token-ops");
        assert_eq!(s.phase(), SessionPhase::AuthenticatedLoaded);
        assert_eq!(source.calls(), 1);

        assert!(s.has_permission(Some("GET:/admin/users")));
        assert!(s.has_permission(Some("GET:/admin/users/42")));
        assert!(!s.has_permission(Some("GET:/admin/users/42/orders")));
        assert!(!s.has_permission(Some("POST:/admin/users")));

        assert_eq!(store.value(TOKEN_KEY).as_deref(), Some("token-ops"));
        assert_eq!(store.value(IS_SUPER_KEY).as_deref(), Some("0"));
        assert_eq!(store.value(ROLES_KEY).as_deref(), Some(r#"["operator"]"#));
        assert_eq!(
            store.value(PERMISSIONS_KEY).as_deref(),
            Some(r#"["GET:/admin/users","GET:/admin/users/:id"]"#)
        );

        let snapshot = s.snapshot();
        assert!(snapshot.loaded);
        assert!(snapshot.loaded_at.is_some());
        assert_eq!(snapshot.permission_keys.len(), 2);
    }

    #[tokio::test]
    async fn failed_login_leaves_session_unauthenticated() {
        let source = Arc::new(MockSource::new(operator_info()));
        let s = session(source.clone(), Arc::new(MockStore::default()));

        let err = s.login(&LoginRequest::new("ops", "wrong")).await.unwrap_err();
        assert!(matches!(err, PortcullisError::InvalidCredentials { .. }));
        assert_eq!(s.phase(), SessionPhase::Unauthenticated);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn superuser_bypasses_matching() {
        let s = session(
            Arc::new(MockSource::new(super_info())),
            Arc::new(MockStore::default()),
        );
        s.login(&LoginRequest::new("root", "secret")).await.unwrap();

        assert!(s.snapshot().permission_keys.is_empty());
        assert!(s.has_permission(Some("DELETE:/admin/anything")));
        assert!(s.has_permission(Some("garbage")));
    }

    #[tokio::test]
    async fn logout_revokes_grants_and_storage() {
        let store = Arc::new(MockStore::default());
        let s = session(Arc::new(MockSource::new(operator_info())), store.clone());
        s.login(&LoginRequest::new("ops", "secret")).await.unwrap();
        assert!(s.has_permission(Some("GET:/admin/users")));

        s.logout();

        assert!(!s.has_permission(Some("GET:/admin/users")));
        assert_eq!(s.phase(), SessionPhase::Unauthenticated);
        assert!(!s.is_loaded());
        for key in [TOKEN_KEY, IS_SUPER_KEY, ROLES_KEY, PERMISSIONS_KEY] {
            assert_eq!(store.value(key), None, "{key} should be removed");
        }
    }

    // ── Hydration ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn hydrate_restores_previous_session_without_marking_loaded() {
        let store = Arc::new(MockStore::with(&[
            (TOKEN_KEY, "tok"),
            (IS_SUPER_KEY, "0"),
            (ROLES_KEY, r#"["operator"]"#),
            (PERMISSIONS_KEY, r#"["*:/admin/*"]"#),
        ]));
        let s = session(Arc::new(MockSource::new(operator_info())), store);
        s.hydrate();

        assert_eq!(s.phase(), SessionPhase::AuthenticatedUnloaded);
        assert_eq!(s.token().as_deref(), Some("tok"));
        assert!(s.has_permission(Some("DELETE:/admin/anything/nested")));
        assert!(s.snapshot().roles.contains("operator"));
    }

    #[tokio::test]
    async fn hydrate_tolerates_corrupt_entries() {
        let store = Arc::new(MockStore::with(&[
            (TOKEN_KEY, "tok"),
            (IS_SUPER_KEY, "yes"),
            (ROLES_KEY, "{not json"),
            (PERMISSIONS_KEY, "GET:/admin/users"),
        ]));
        let s = session(Arc::new(MockSource::new(operator_info())), store);
        s.hydrate();

        let snapshot = s.snapshot();
        assert!(!snapshot.is_super);
        assert!(snapshot.roles.is_empty());
        assert!(snapshot.permission_keys.is_empty());
        assert!(!s.has_permission(Some("GET:/admin/users")));
    }

    #[tokio::test]
    async fn store_failures_do_not_break_the_session() {
        let s = AuthzSession::new(Arc::new(MockSource::new(operator_info())), Arc::new(BrokenStore));
        s.hydrate();
        assert_eq!(s.phase(), SessionPhase::Unauthenticated);

        s.login(&LoginRequest::new("ops", "secret")).await.unwrap();
        assert!(s.has_permission(Some("GET:/admin/users")));
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn load_without_token_clears_cache() {
        let store = Arc::new(MockStore::with(&[(PERMISSIONS_KEY, r#"["*:/*"]"#)]));
        let source = Arc::new(MockSource::new(operator_info()));
        let s = session(source.clone(), store.clone());
        s.hydrate();
        assert!(s.has_permission(Some("GET:/anything")));

        let outcome = s.load_authz().await.unwrap();

        assert_eq!(outcome, LoadOutcome::NoCredential);
        assert_eq!(source.calls(), 0);
        assert!(!s.has_permission(Some("GET:/anything")));
        assert_eq!(store.value(PERMISSIONS_KEY), None);
    }

    #[tokio::test]
    async fn load_failure_propagates_and_keeps_session_unloaded() {
        let store = Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")]));
        let s = session(
            Arc::new(MockSource::failing(PortcullisError::Unauthorized {
                reason: "expired".to_string(),
            })),
            store,
        );
        s.hydrate();

        let err = s.load_authz().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(s.phase(), SessionPhase::AuthenticatedUnloaded);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(MockSource::gated(operator_info(), gate.clone()));
        let store = Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")]));
        let s = session(source.clone(), store);
        s.hydrate();

        let (a, b, ()) = tokio::join!(s.load_authz(), s.load_authz(), async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(a.unwrap(), LoadOutcome::Applied);
        assert_eq!(b.unwrap(), LoadOutcome::Applied);
        assert_eq!(source.calls(), 1);
        assert!(s.is_loaded());
    }

    #[tokio::test]
    async fn sequential_loads_fetch_again() {
        let source = Arc::new(MockSource::new(operator_info()));
        let s = session(source.clone(), Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")])));
        s.hydrate();

        s.load_authz().await.unwrap();
        *source.info.lock() = Ok(super_info());
        s.load_authz().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(s.snapshot().is_super);
    }

    #[tokio::test]
    async fn response_arriving_after_logout_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(MockSource::gated(super_info(), gate.clone()));
        let store = Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")]));
        let s = session(source, store.clone());
        s.hydrate();

        let (outcome, ()) = tokio::join!(s.load_authz(), async {
            tokio::task::yield_now().await;
            s.logout();
            gate.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
        assert_eq!(s.phase(), SessionPhase::Unauthenticated);
        assert!(!s.has_permission(Some("GET:/admin/users")));
        assert_eq!(store.value(IS_SUPER_KEY), None);
    }

    #[tokio::test]
    async fn failure_of_superseded_fetch_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(MockSource {
            gate: Some(gate.clone()),
            ..MockSource::failing(PortcullisError::Transport {
                reason: "connection reset".to_string(),
            })
        });
        let s = session(source, Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")])));
        s.hydrate();

        let (outcome, ()) = tokio::join!(s.load_authz(), async {
            tokio::task::yield_now().await;
            s.clear();
            gate.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
    }

    /// Within one epoch, a response from an older fetch must not overwrite
    /// the payload of a newer fetch that was already applied.
    #[tokio::test]
    async fn older_fetch_applied_after_newer_one_is_discarded() {
        let store = Arc::new(MockStore::with(&[(TOKEN_KEY, "tok")]));
        let s = session(Arc::new(MockSource::new(super_info())), store.clone());
        s.hydrate();
        let epoch = s.state.lock().epoch;

        let (seq_a, _fetch_a) = s.begin_fetch(epoch, "tok".to_string());
        s.finish_fetch(seq_a);

        let (seq_b, fetch_b) = s.begin_fetch(epoch, "tok".to_string());
        assert!(seq_b > seq_a);
        let info_b = fetch_b.await.unwrap();
        s.finish_fetch(seq_b);

        assert_eq!(s.apply(epoch, seq_b, info_b), LoadOutcome::Applied);
        assert_eq!(s.apply(epoch, seq_a, operator_info()), LoadOutcome::Discarded);

        let snapshot = s.snapshot();
        assert!(snapshot.is_super);
        assert_eq!(snapshot.roles.iter().map(String::as_str).collect::<Vec<_>>(), vec!["super"]);
        assert!(snapshot.permission_keys.is_empty());
        assert_eq!(store.value(IS_SUPER_KEY).as_deref(), Some("1"));
    }
}
