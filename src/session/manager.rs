use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::AuthApi;
use crate::errors::AuthError;
use crate::models::{AccessAttempt, Role, Session, SessionState, TokenRecord, User};
use crate::store::{AuditLog, TokenStore};

/// Owns the authentication lifecycle: restore-on-startup, login,
/// logout, autonomous expiry, role queries, and access auditing.
///
/// All public operations return values or expose state; none of them
/// panic or throw across the surface. State transitions are applied in
/// the order their triggering futures resolve; the state mutex is
/// never held across an await.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    audit: AuditLog,
    user_agent: String,
    /// Validity window applied when the backend omits one, in ms.
    fallback_window_ms: i64,
    state: Mutex<SessionState>,
    watch_tx: watch::Sender<Session>,
    timer: Mutex<ExpiryTimer>,
}

/// One outstanding scheduled expiry per session. The generation is
/// bumped on every arm/cancel; a firing timer that lost the race
/// checks it and does nothing.
struct ExpiryTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Inner {
    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap();
        tracing::debug!(from = state.name(), to = next.name(), "session transition");
        *state = next;
        self.watch_tx.send_replace(state.snapshot());
    }

    /// Expiry-timer callback: local teardown only, no server
    /// round-trip. Stale generations are ignored.
    fn expire(&self, generation: u64) {
        {
            let timer = self.timer.lock().unwrap();
            if timer.generation != generation {
                tracing::debug!(generation, "stale expiry timer ignored");
                return;
            }
        }
        self.store.clear();
        self.set_state(SessionState::Expired);
        tracing::info!("session expired");
        self.set_state(SessionState::Unauthenticated);
    }
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: Arc<dyn TokenStore>,
        audit: AuditLog,
        user_agent: String,
        fallback_window_ms: i64,
    ) -> Self {
        let (watch_tx, _) = watch::channel(Session::initializing());
        SessionManager {
            inner: Arc::new(Inner {
                api,
                store,
                audit,
                user_agent,
                fallback_window_ms,
                state: Mutex::new(SessionState::Initializing),
                watch_tx,
                timer: Mutex::new(ExpiryTimer {
                    generation: 0,
                    handle: None,
                }),
            }),
        }
    }

    /// Resolve the initial `Initializing` state from the token store:
    /// a live record confirmed by the backend restores the session,
    /// anything else lands in `Unauthenticated`. An expired record is
    /// cleared without a backend call.
    pub async fn restore(&self) {
        let now = Utc::now();
        match self.inner.store.load() {
            None => self.inner.set_state(SessionState::Unauthenticated),
            Some(record) if record.is_expired(now) => {
                tracing::debug!("stored session already expired");
                self.inner.store.clear();
                self.inner.set_state(SessionState::Unauthenticated);
            }
            Some(record) => match self.inner.api.current_user(&record.token).await {
                Ok(payload) => {
                    match User::from_wire(payload.username, payload.email, payload.roles) {
                        Ok(user) => {
                            tracing::info!(username = %user.username, "session restored");
                            let remaining = record.remaining(now);
                            self.inner.set_state(SessionState::Authenticated { user });
                            self.arm_expiry(remaining);
                        }
                        Err(e) => {
                            tracing::warn!("stored session rejected: {e}");
                            self.inner.store.clear();
                            self.inner.set_state(SessionState::Unauthenticated);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("could not validate stored session: {e}");
                    self.inner.store.clear();
                    self.inner.set_state(SessionState::Unauthenticated);
                }
            },
        }
    }

    /// Exchange credentials for an authenticated session.
    ///
    /// On success the token record is persisted, the expiry timer is
    /// armed for the granted window, and the session becomes
    /// `Authenticated`. On any failure the session reverts to
    /// `Unauthenticated` and no token record is written.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.inner.set_state(SessionState::Authenticating);

        let resp = match self.inner.api.login(username, password).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(username, "login failed: {e}");
                self.inner.set_state(SessionState::Unauthenticated);
                return Err(e.into_auth_error());
            }
        };

        let user = match User::from_wire(resp.user.username, resp.user.email, resp.user.roles) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(username, "unusable login payload: {e}");
                self.inner.set_state(SessionState::Unauthenticated);
                return Err(e);
            }
        };

        let window_ms = resp
            .expires_in_minutes
            .map(|m| m * 60_000)
            .unwrap_or(self.inner.fallback_window_ms);
        let record = TokenRecord::new(resp.token, window_ms, Utc::now());
        if let Err(e) = self.inner.store.save(&record) {
            tracing::warn!("failed to persist token record: {e}");
        }

        self.inner.set_state(SessionState::Authenticated { user: user.clone() });
        self.arm_expiry(Duration::from_millis(window_ms.max(0) as u64));
        tracing::info!(username = %user.username, roles = %user.roles, "login successful");
        Ok(user)
    }

    /// Clear the session. The backend is notified best-effort; local
    /// state is cleared regardless of its answer. Safe to call twice.
    pub async fn logout(&self) {
        self.cancel_expiry();
        if let Some(record) = self.inner.store.load() {
            if let Err(e) = self.inner.api.logout(&record.token).await {
                tracing::warn!("logout notification failed: {e}");
            }
        }
        self.inner.store.clear();
        self.inner.set_state(SessionState::Unauthenticated);
        tracing::info!("logged out");
    }

    // ── Role queries ────────────────────────────────────────────

    /// Membership in the current user's role set. A check with no user
    /// loaded answers false and leaves a diagnostic in the log.
    pub fn has_role(&self, role: Role) -> bool {
        let state = self.inner.state.lock().unwrap();
        match state.user() {
            Some(user) => user.roles.contains(role),
            None => {
                tracing::warn!(role = role.as_str(), "role check with no authenticated user");
                false
            }
        }
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn is_student(&self) -> bool {
        self.with_roles(|r| r.is_student())
    }

    pub fn is_teacher(&self) -> bool {
        self.with_roles(|r| r.is_teacher())
    }

    pub fn is_admin(&self) -> bool {
        self.with_roles(|r| r.is_admin())
    }

    fn with_roles(&self, f: impl FnOnce(&crate::models::RoleSet) -> bool) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.user().map(|u| f(&u.roles)).unwrap_or(false)
    }

    // ── Auditing ────────────────────────────────────────────────

    /// Record a project-access attempt against the current session.
    /// The username is absent when nobody is logged in.
    pub fn log_access_attempt(&self, project_id: &str, success: bool) {
        let username = {
            let state = self.inner.state.lock().unwrap();
            state.user().map(|u| u.username.clone())
        };
        tracing::info!(project_id, success, "access attempt recorded");
        self.inner.audit.append(AccessAttempt {
            username,
            project_id: project_id.to_string(),
            success,
            timestamp: Utc::now(),
            user_agent: self.inner.user_agent.clone(),
        });
    }

    /// Retained audit entries, oldest first.
    pub fn audit_trail(&self) -> Vec<AccessAttempt> {
        self.inner.audit.recent()
    }

    // ── Observation ─────────────────────────────────────────────

    pub fn snapshot(&self) -> Session {
        self.inner.state.lock().unwrap().snapshot()
    }

    /// Watch session snapshots; the receiver holds the latest value
    /// and is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.watch_tx.subscribe()
    }

    // ── Expiry timer ────────────────────────────────────────────

    fn arm_expiry(&self, window: Duration) {
        let mut timer = self.inner.timer.lock().unwrap();
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
        timer.generation += 1;
        let generation = timer.generation;
        let inner = Arc::clone(&self.inner);
        tracing::debug!(window_ms = window.as_millis() as u64, "expiry timer armed");
        timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            inner.expire(generation);
        }));
    }

    fn cancel_expiry(&self) {
        let mut timer = self.inner.timer.lock().unwrap();
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
        timer.generation += 1;
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{LoginResponse, UserPayload};
    use crate::errors::ApiError;
    use crate::store::MemoryTokenStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend: each call pops the next queued answer.
    #[derive(Default)]
    struct StubApi {
        login_answers: Mutex<VecDeque<Result<LoginResponse, ApiError>>>,
        me_answers: Mutex<VecDeque<Result<UserPayload, ApiError>>>,
        me_calls: AtomicUsize,
        logout_calls: AtomicUsize,
    }

    impl StubApi {
        fn queue_login(&self, answer: Result<LoginResponse, ApiError>) {
            self.login_answers.lock().unwrap().push_back(answer);
        }

        fn queue_me(&self, answer: Result<UserPayload, ApiError>) {
            self.me_answers.lock().unwrap().push_back(answer);
        }
    }

    #[async_trait]
    impl AuthApi for StubApi {
        async fn login(&self, _u: &str, _p: &str) -> Result<LoginResponse, ApiError> {
            self.login_answers
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected login call")
        }

        async fn current_user(&self, _token: &str) -> Result<UserPayload, ApiError> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            self.me_answers
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected current_user call")
        }

        async fn logout(&self, _token: &str) -> Result<(), ApiError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn student_payload() -> UserPayload {
        UserPayload {
            username: "estudiante_demo".into(),
            email: "e@x.com".into(),
            roles: Some(vec!["ROLE_STUDENT".into()]),
        }
    }

    fn login_response(minutes: i64) -> LoginResponse {
        LoginResponse {
            token: "abc".into(),
            token_type: Some("Bearer".into()),
            expires_in_minutes: Some(minutes),
            user: student_payload(),
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("innolink-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn manager(api: Arc<StubApi>, store: Arc<MemoryTokenStore>, dir: &PathBuf) -> SessionManager {
        SessionManager::new(
            api,
            store,
            AuditLog::new(dir),
            "InnoSistemas/0.1.0".into(),
            3_600_000,
        )
    }

    #[tokio::test]
    async fn test_login_success_reflects_backend_roles() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Ok(login_response(60)));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        let user = session.login("estudiante_demo", "validpass").await.unwrap();
        assert_eq!(user.username, "estudiante_demo");

        let snap = session.snapshot();
        assert!(snap.is_authenticated);
        assert!(!snap.is_loading);
        assert!(session.has_role(Role::Student));
        assert!(!session.has_role(Role::Teacher));
        assert!(store.load().is_some());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_invalid_credentials_leave_store_empty() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Err(ApiError::Status {
            status: 401,
            message: "bad credentials".into(),
        }));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        let err = session.login("ana", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!session.snapshot().is_authenticated);
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_roles_is_malformed_response() {
        let api = Arc::new(StubApi::default());
        let mut resp = login_response(60);
        resp.user.roles = None;
        api.queue_login(Ok(resp));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        let err = session.login("ana", "pass").await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_logout_twice_is_safe() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Ok(login_response(60)));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api.clone(), store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        session.login("ana", "pass").await.unwrap();
        session.logout().await;
        session.logout().await;

        assert!(!session.snapshot().is_authenticated);
        assert!(store.load().is_none());
        // Second logout had no token left, so only one notification.
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_timer_clears_session_locally() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Ok(login_response(1)));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api.clone(), store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        session.login("ana", "pass").await.unwrap();
        assert!(session.snapshot().is_authenticated);

        // Sleep past the 1-minute window; paused time auto-advances
        // through the armed timer first.
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(!session.snapshot().is_authenticated);
        assert!(store.load().is_none());
        // Expiry is local: the backend was never told.
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_never_fires_after_relogin() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Ok(login_response(1)));
        api.queue_login(Ok(login_response(60)));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store.clone(), &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        session.login("ana", "pass").await.unwrap();
        // Re-login replaces the 1-minute window with a 60-minute one.
        session.login("ana", "pass").await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(session.snapshot().is_authenticated);
        assert!(store.load().is_some());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!session.snapshot().is_authenticated);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_restore_with_live_record_authenticates() {
        let api = Arc::new(StubApi::default());
        api.queue_me(Ok(student_payload()));
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(&TokenRecord::new("abc".into(), 60_000, Utc::now()))
            .unwrap();
        let dir = temp_dir();
        let session = manager(api, store, &dir);

        assert!(session.snapshot().is_loading);
        session.restore().await;

        let snap = session.snapshot();
        assert!(snap.is_authenticated);
        assert_eq!(snap.user.unwrap().username, "estudiante_demo");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_restore_with_expired_record_skips_backend() {
        let api = Arc::new(StubApi::default());
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(&TokenRecord::new("abc".into(), -1, Utc::now()))
            .unwrap();
        let dir = temp_dir();
        let session = manager(api.clone(), store.clone(), &dir);

        session.restore().await;

        assert!(!session.snapshot().is_authenticated);
        assert!(store.load().is_none());
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_record() {
        let api = Arc::new(StubApi::default());
        api.queue_me(Err(ApiError::Status {
            status: 401,
            message: "expired".into(),
        }));
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(&TokenRecord::new("abc".into(), 60_000, Utc::now()))
            .unwrap();
        let dir = temp_dir();
        let session = manager(api, store.clone(), &dir);

        session.restore().await;

        assert!(!session.snapshot().is_authenticated);
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_role_check_without_user_is_false() {
        let api = Arc::new(StubApi::default());
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store, &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        assert!(!session.has_role(Role::Student));
        assert!(!session.has_any_role(&[Role::Student, Role::Admin]));
        assert!(!session.is_admin());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_access_attempt_without_user_has_no_username() {
        let api = Arc::new(StubApi::default());
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store, &dir);
        session.inner.set_state(SessionState::Unauthenticated);

        session.log_access_attempt("proyecto-a", false);

        let trail = session.audit_trail();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].project_id, "proyecto-a");
        assert!(!trail[0].success);
        assert!(trail[0].username.is_none());
        assert_eq!(trail[0].user_agent, "InnoSistemas/0.1.0");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_watch_observes_transitions() {
        let api = Arc::new(StubApi::default());
        api.queue_login(Ok(login_response(60)));
        let store = Arc::new(MemoryTokenStore::new());
        let dir = temp_dir();
        let session = manager(api, store, &dir);
        let mut rx = session.subscribe();
        session.inner.set_state(SessionState::Unauthenticated);

        session.login("ana", "pass").await.unwrap();

        // The receiver holds the latest snapshot after the login.
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated);
        std::fs::remove_dir_all(&dir).ok();
    }
}
