// Local session monitor
// Stamps a freshly minted session token locally and into the registrar on
// login, then watches the registrar for a divergent token and forcibly
// invalidates the local session when one appears.

use super::types::{LoginOutcome, LogoutReason, SessionError, SessionState};
use crate::auth::{AuthProvider, Identity, PersistenceMode};
use crate::config::RegistrarConfig;
use crate::registrar::{write_session_with_retry, RecordStream, SessionRegistrar};
use crate::store::{LocalStore, LOGOUT_REASON_KEY, SESSION_ID_KEY};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct MonitorInner {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn LocalStore>,
    state: Mutex<SessionState>,
    // Subscription watcher; Some only while a session is authenticated.
    // Taken exactly once on any transition out of Authenticated.
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorInner {
    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Forced sign-out triggered by a divergent remote token. Runs every
    /// side effect even if an earlier one fails; nothing here is fatal.
    async fn force_invalidate(self: &Arc<Self>) {
        info!("Remote session token diverged, invalidating local session");

        if let Err(e) = self.auth.sign_out().await {
            warn!("Sign-out during invalidation failed: {}", e);
        }
        if let Err(e) = self
            .store
            .set(LOGOUT_REASON_KEY, LogoutReason::ConcurrentLogin.as_str())
        {
            warn!("Failed to persist logout reason: {}", e);
        }
        if let Err(e) = self.store.remove(SESSION_ID_KEY) {
            warn!("Failed to clear local session token: {}", e);
        }

        self.set_state(SessionState::Unauthenticated);

        // The watcher is the caller; dropping the handle detaches the task,
        // which returns right after this call.
        self.watcher.lock().unwrap().take();
    }
}

/// Enforces session uniqueness for one client instance.
/// Dependencies are explicit constructor arguments; the monitor owns its
/// subscription lifecycle and tears it down on logout or invalidation.
pub struct SessionMonitor {
    inner: Arc<MonitorInner>,
    registrar: Arc<dyn SessionRegistrar>,
    registrar_config: RegistrarConfig,
}

impl SessionMonitor {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        registrar: Arc<dyn SessionRegistrar>,
        store: Arc<dyn LocalStore>,
        registrar_config: RegistrarConfig,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                auth,
                store,
                state: Mutex::new(SessionState::Unauthenticated),
                watcher: Mutex::new(None),
            }),
            registrar,
            registrar_config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.lock().unwrap().clone()
    }

    /// Locally stamped session token, if a session is live
    pub fn session_token(&self) -> Option<String> {
        self.inner.store.get(SESSION_ID_KEY).ok().flatten()
    }

    pub async fn current_user(&self) -> Option<Identity> {
        self.inner.auth.current_user().await
    }

    /// Authenticate and establish a new unique session.
    ///
    /// Rejects while another login is in flight. On success the freshly
    /// minted token is stamped locally, written to the registrar (the write
    /// is awaited before the subscription activates, so the monitor never
    /// invalidates itself on its own write), and the change watcher starts.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginOutcome, SessionError> {
        let had_session = {
            let mut state = self.inner.state.lock().unwrap();
            if *state == SessionState::Authenticating {
                return Err(SessionError::LoginInFlight);
            }
            let had = matches!(*state, SessionState::Authenticated { .. });
            *state = SessionState::Authenticating;
            had
        };

        // A re-login over a live session replaces it; the old watcher must
        // go before a new subscription exists.
        self.dispose_watcher();

        match self.do_login(email, password, remember).await {
            Ok(outcome) => {
                // The watcher is live from inside do_login and may already
                // have invalidated this very session. Only claim
                // Authenticated while the transition is still ours; a
                // completed invalidation must not be resurrected.
                let mut state = self.inner.state.lock().unwrap();
                if *state == SessionState::Authenticating {
                    *state = SessionState::Authenticated {
                        session_id: outcome.session_id.clone(),
                    };
                }
                Ok(outcome)
            }
            Err(e) => {
                // A failed re-login ended the previous session's watcher;
                // its auth session and stamped token have to go with it.
                if had_session {
                    if let Err(se) = self.inner.auth.sign_out().await {
                        warn!("Sign-out after failed re-login failed: {}", se);
                    }
                    if let Err(se) = self.inner.store.remove(SESSION_ID_KEY) {
                        warn!("Failed to clear local session token: {}", se);
                    }
                }
                self.inner.set_state(SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    async fn do_login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginOutcome, SessionError> {
        let mode = if remember {
            PersistenceMode::Durable
        } else {
            PersistenceMode::SessionOnly
        };
        self.inner.auth.set_persistence(mode).await?;

        let identity = self.inner.auth.sign_in(email, password).await?;

        // Collision-resistant token, unique per login event
        let session_id = Uuid::new_v4().to_string();

        if let Err(e) = self.inner.store.set(SESSION_ID_KEY, &session_id) {
            warn!("Failed to stamp local session token: {}", e);
        }

        let mut registrar_degraded = false;

        match write_session_with_retry(
            self.registrar.as_ref(),
            &identity.uid,
            &session_id,
            &self.registrar_config,
        )
        .await
        {
            Ok(()) => match self.registrar.subscribe(&identity.uid).await {
                Ok(stream) => self.spawn_watcher(session_id.clone(), stream),
                Err(e) => {
                    warn!("Registrar subscription failed, enforcement degraded: {}", e);
                    registrar_degraded = true;
                }
            },
            Err(e) => {
                // The user stays logged in locally; cross-device enforcement
                // is degraded until the next successful login.
                warn!("Session write exhausted retries, enforcement degraded: {}", e);
                registrar_degraded = true;
            }
        }

        info!("Session {} established for {}", session_id, identity.uid);

        Ok(LoginOutcome {
            identity,
            session_id,
            registrar_degraded,
        })
    }

    /// Explicit user-initiated logout. Disposes the subscription, clears the
    /// local token, and deliberately leaves the remote record in place: the
    /// next login from any device overwrites it.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.dispose_watcher();

        self.inner.auth.sign_out().await?;

        if let Err(e) = self.inner.store.remove(SESSION_ID_KEY) {
            warn!("Failed to clear local session token: {}", e);
        }

        self.inner.set_state(SessionState::Unauthenticated);
        info!("User logged out");
        Ok(())
    }

    /// One-shot logout reason for the next login screen render; reading it
    /// consumes the flag
    pub fn take_logout_reason(&self) -> Option<LogoutReason> {
        let value = self.inner.store.get(LOGOUT_REASON_KEY).ok().flatten()?;
        if let Err(e) = self.inner.store.remove(LOGOUT_REASON_KEY) {
            warn!("Failed to clear logout reason flag: {}", e);
        }
        LogoutReason::parse(&value)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), SessionError> {
        self.inner.auth.send_password_reset(email).await?;
        Ok(())
    }

    fn spawn_watcher(&self, local_token: String, stream: RecordStream) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(watch_registrar(inner, stream, local_token));
        *self.inner.watcher.lock().unwrap() = Some(handle);
    }

    fn dispose_watcher(&self) {
        if let Some(handle) = self.inner.watcher.lock().unwrap().take() {
            debug!("Disposing registrar subscription");
            handle.abort();
        }
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.dispose_watcher();
    }
}

/// Compares every observed remote token against the locally held one.
/// The first observation is the just-written record, which matches the local
/// token and is ignored; only a genuinely divergent token invalidates.
async fn watch_registrar(
    inner: Arc<MonitorInner>,
    mut stream: RecordStream,
    local_token: String,
) {
    loop {
        let divergent = {
            let record = stream.borrow_and_update();
            match record.as_ref() {
                Some(r) => !r.session_id.is_empty() && r.session_id != local_token,
                None => false,
            }
        };

        if divergent {
            inner.force_invalidate().await;
            return;
        }

        if stream.changed().await.is_err() {
            debug!("Registrar channel closed, watcher exiting");
            return;
        }
    }
}
