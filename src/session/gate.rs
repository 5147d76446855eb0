//! The session gate: sign-in, sign-up, sign-out, and who may reach a vault.
//!
//! The gate is the only way to obtain a `VaultStore`. It hands one out
//! only after the identity provider has confirmed the principal, and
//! revokes it on sign-out so stale handles cannot keep writing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{AuthFailure, SessionState};
use crate::errors::{Result, VaultError};
use crate::identity::{IdentityProvider, Principal};
use crate::storage::BlobStorage;
use crate::validation::validate_account_form;
use crate::vault::{StoreOptions, VaultStore};

/// Tunables for the gate and the stores it opens.
#[derive(Debug, Clone, Copy)]
pub struct GateOptions {
    pub store: StoreOptions,
    /// Upper bound on any single identity-provider call.
    pub provider_timeout: Duration,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            store: StoreOptions::default(),
            provider_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Attempt {
    SignIn,
    SignUp,
}

/// Governs authentication state and access to the principal's vault.
pub struct SessionGate {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn BlobStorage>,
    options: GateOptions,
    state: watch::Sender<SessionState>,
    /// The open vault while `Authenticated`. Never held across an await.
    active: Mutex<Option<Arc<VaultStore>>>,
}

impl SessionGate {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn BlobStorage>,
        options: GateOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            provider,
            storage,
            options,
            state,
            active: Mutex::new(None),
        }
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch state transitions (e.g. to drive a spinner or a redirect).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The open vault, if signed in.
    pub fn vault(&self) -> Option<Arc<VaultStore>> {
        self.lock_active().clone()
    }

    /// Sign in an existing account and unlock its vault.
    ///
    /// The returned store is unloaded; call `load()` before using it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Arc<VaultStore>> {
        validate_account_form(email, password, None)?;
        self.authenticate(Attempt::SignIn, email, password).await
    }

    /// Register a new account and unlock its (empty) vault.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Arc<VaultStore>> {
        validate_account_form(email, password, Some(confirmation))?;
        self.authenticate(Attempt::SignUp, email, password).await
    }

    /// Close the vault, return to `Anonymous`, then end the provider session.
    ///
    /// Local teardown always happens; a provider failure is reported
    /// afterwards. Signing out while anonymous clears a lingering
    /// `AuthError`.
    pub async fn sign_out(&self) -> Result<()> {
        let active = self.lock_active().take();
        let Some(store) = active else {
            self.state.send_if_modified(|state| {
                if matches!(state, SessionState::AuthError(_)) {
                    *state = SessionState::Anonymous;
                    true
                } else {
                    false
                }
            });
            return Ok(());
        };

        let principal = store.principal().clone();
        store.revoke();
        self.state.send_replace(SessionState::Anonymous);
        store.close().await;
        info!(principal = %principal.id, "signed out");

        match tokio::time::timeout(self.options.provider_timeout, self.provider.sign_out(&principal))
            .await
        {
            Err(_) => Err(AuthFailure::Unavailable.into()),
            Ok(Err(e)) => Err(AuthFailure::from(e).into()),
            Ok(Ok(())) => Ok(()),
        }
    }

    async fn authenticate(
        &self,
        attempt: Attempt,
        email: &str,
        password: &str,
    ) -> Result<Arc<VaultStore>> {
        let guard = self.begin_attempt()?;
        debug!(?attempt, "contacting identity provider");

        let call = match attempt {
            Attempt::SignIn => self.provider.authenticate(email, password),
            Attempt::SignUp => self.provider.create_account(email, password),
        };
        let confirmed = match tokio::time::timeout(self.options.provider_timeout, call).await {
            Err(_) => Err(AuthFailure::Unavailable),
            Ok(result) => result.map_err(AuthFailure::from),
        };

        let principal = match confirmed {
            Ok(principal) => principal,
            Err(reason) => {
                warn!(?attempt, %reason, "authentication failed");
                guard.fail(reason.clone());
                return Err(reason.into());
            }
        };

        let store = match VaultStore::unlock(
            principal.clone(),
            password,
            Arc::clone(&self.storage),
            self.options.store,
        )
        .await
        {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(principal = %principal.id, error = %e, "vault unlock failed");
                guard.fail(AuthFailure::Other(e.to_string()));
                return Err(e);
            }
        };

        *self.lock_active() = Some(Arc::clone(&store));
        info!(principal = %principal.id, ?attempt, "authenticated");
        guard.succeed(principal);
        Ok(store)
    }

    /// Move to `Authenticating` unless an attempt is running or a
    /// session is already open.
    fn begin_attempt(&self) -> Result<AttemptGuard<'_>> {
        let mut refused = None;
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticating => {
                refused = Some(VaultError::AuthInProgress);
                false
            }
            SessionState::Authenticated(_) => {
                refused = Some(VaultError::SessionActive);
                false
            }
            SessionState::Anonymous | SessionState::AuthError(_) => {
                *state = SessionState::Authenticating;
                true
            }
        });

        match refused {
            Some(err) => Err(err),
            None => Ok(AttemptGuard {
                state: &self.state,
                settled: false,
            }),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<VaultStore>>> {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Resolves `Authenticating` even when the attempt's future is dropped.
struct AttemptGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    settled: bool,
}

impl AttemptGuard<'_> {
    fn succeed(mut self, principal: Principal) {
        self.settled = true;
        self.state
            .send_replace(SessionState::Authenticated(principal));
    }

    fn fail(mut self, reason: AuthFailure) {
        self.settled = true;
        self.state.send_replace(SessionState::AuthError(reason));
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("authentication attempt cancelled");
            self.state.send_replace(SessionState::Anonymous);
        }
    }
}
