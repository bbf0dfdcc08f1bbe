/// Session gating for protected views
///
/// A session is valid only when the token is non-empty AND the identity
/// record parses. Checking is local, synchronous and side-effect free.
use crate::config::SessionConfig;
use crate::domain::{Identity, SessionStatus};
use crate::error::{SyncError, SyncResult};
use crate::repository::SessionApi;
use crate::session::{Navigator, Route, SessionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    api: Arc<dyn SessionApi>,
    navigator: Arc<dyn Navigator>,
    keys: SessionConfig,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn SessionStore>,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
        keys: SessionConfig,
    ) -> Self {
        Self {
            store,
            api,
            navigator,
            keys,
        }
    }

    /// Read session evidence and decide validity
    pub fn check_session(&self) -> SessionStatus {
        let token = self
            .store
            .get(&self.keys.token_key)
            .filter(|t| !t.trim().is_empty());
        let identity = self
            .store
            .get(&self.keys.identity_key)
            .and_then(|raw| match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    debug!(error = %e, "Identity record is malformed");
                    None
                }
            });

        match (token, identity) {
            (Some(_), Some(identity)) => SessionStatus::valid(identity),
            _ => SessionStatus::invalid(),
        }
    }

    /// Run `mount` only for a valid session.
    ///
    /// On an invalid session the navigator is sent to login and `mount` is
    /// never called, so nothing protected is fetched or rendered.
    pub fn protect<T, F>(&self, mount: F) -> SyncResult<T>
    where
        F: FnOnce(Identity) -> T,
    {
        let identity = self.require()?;
        Ok(mount(identity))
    }

    /// Identity of a valid session, or redirect to login
    pub fn require(&self) -> SyncResult<Identity> {
        match self.check_session().identity {
            Some(identity) => Ok(identity),
            None => {
                self.navigator.navigate(Route::Login);
                Err(SyncError::SessionInvalid)
            }
        }
    }

    /// Log in, persist the issued evidence and go to the feed
    pub async fn login(&self, email: &str, password: &str) -> SyncResult<Identity> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SyncError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let grant = self.api.login(email.trim(), password).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;
        self.store_session(&grant.token, &grant.identity)?;
        self.navigator.navigate(Route::Feed);
        Ok(grant.identity)
    }

    /// Update username and email, then rewrite the stored identity
    pub async fn update_profile(&self, username: &str, email: &str) -> SyncResult<Identity> {
        let mut identity = self.require()?;
        let (username, email) = (username.trim(), email.trim());
        if username.is_empty() || email.is_empty() {
            return Err(SyncError::Validation(
                "Username and email are required".to_string(),
            ));
        }

        match self.api.update_profile(username, email).await {
            Ok(true) => {}
            Ok(false) => return Err(SyncError::Rejected("Failed to update profile".to_string())),
            Err(e) => {
                self.intercept(&e);
                return Err(e);
            }
        }

        identity.username = username.to_string();
        identity.email = Some(email.to_string());
        self.store
            .set(&self.keys.identity_key, serde_json::to_string(&identity)?);
        info!(user = %identity.username, "Profile updated");
        Ok(identity)
    }

    /// Delete the account on the server, then drop the session locally.
    /// Local evidence survives a refused or failed deletion.
    pub async fn delete_account(&self) -> SyncResult<()> {
        let identity = self.require()?;

        match self.api.delete_account().await {
            Ok(true) => {}
            Ok(false) => return Err(SyncError::Rejected("Failed to delete account".to_string())),
            Err(e) => {
                self.intercept(&e);
                return Err(e);
            }
        }

        self.clear_evidence();
        info!(user = %identity.username, "Account deleted");
        self.navigator.navigate(Route::Login);
        Ok(())
    }

    /// Persist evidence obtained by the login flow
    pub fn store_session(&self, token: &str, identity: &Identity) -> SyncResult<()> {
        if token.trim().is_empty() {
            return Err(SyncError::Validation("Session token must not be empty".to_string()));
        }
        let encoded = serde_json::to_string(identity)?;
        self.store.set(&self.keys.token_key, token.to_string());
        self.store.set(&self.keys.identity_key, encoded);
        info!(user = %identity.username, "Session stored");
        Ok(())
    }

    /// Drop local evidence and send the user to login
    pub fn invalidate(&self) {
        warn!("Session rejected, redirecting to login");
        self.clear_evidence();
        self.navigator.navigate(Route::Login);
    }

    /// Route an operation error through the invalidation path when it is an
    /// auth rejection. Returns true if it was.
    pub fn intercept(&self, err: &SyncError) -> bool {
        if err.is_session_invalid() {
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Ask the remote API whether the session is still accepted
    pub async fn validate_remote(&self) -> SessionStatus {
        if !self.check_session().is_valid {
            self.invalidate();
            return SessionStatus::invalid();
        }

        match self.api.validate_session().await {
            Ok(status) if status.is_valid => status,
            Ok(_) | Err(SyncError::SessionInvalid) => {
                self.invalidate();
                SessionStatus::invalid()
            }
            Err(e) => {
                // Server unreachable is not proof of an invalid session
                warn!(error = %e, "Remote session validation failed");
                self.check_session()
            }
        }
    }

    /// Local logout. Server notification failures are logged, never fatal.
    pub async fn logout(&self) {
        self.clear_evidence();

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Failed to notify server of logout");
        }

        info!("Logged out");
        self.navigator.navigate(Route::Login);
    }

    fn clear_evidence(&self) {
        self.store.remove(&self.keys.token_key);
        self.store.remove(&self.keys.identity_key);
    }
}
