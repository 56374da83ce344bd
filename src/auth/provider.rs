// Auth provider implementations
// This module handles credential verification and identity lifecycle against
// the external authentication authority.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Authenticated user reference issued by the authority
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    /// Name to greet the user with: display name, or the email local part
    pub fn greeting_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or_default().to_string())
    }
}

/// How long the authority should keep the identity session alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Survives app restarts ("remember me")
    Durable,
    /// Cleared when the app instance closes
    SessionOnly,
}

/// Authentication errors, classified for user display
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Wrong email, password or unknown account. Deliberately a single
    /// variant so the user-facing message never reveals which field failed.
    InvalidCredentials,
    /// Authority unreachable or misconfigured
    Transport(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Incorrect email or password"),
            AuthError::Transport(msg) => {
                write!(f, "Could not reach the authentication service: {}", msg)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Trait for authentication authority implementations
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Select the session persistence mode, applied before the next sign-in
    async fn set_persistence(&self, mode: PersistenceMode) -> Result<(), AuthError>;

    /// Verify credentials and establish an identity session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Revoke the current identity session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Currently signed-in identity, if any
    async fn current_user(&self) -> Option<Identity>;

    /// Trigger a password-reset email
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
}

/// A user known to the mock authority
#[derive(Debug, Clone)]
pub struct MockUser {
    pub uid: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Mock auth provider for tests and offline development
pub struct MockAuthProvider {
    users: Vec<MockUser>,
    current: RwLock<Option<Identity>>,
    persistence: RwLock<PersistenceMode>,
    reachable: RwLock<bool>,
}

impl MockAuthProvider {
    pub fn new(users: Vec<MockUser>) -> Self {
        Self {
            users,
            current: RwLock::new(None),
            persistence: RwLock::new(PersistenceMode::SessionOnly),
            reachable: RwLock::new(true),
        }
    }

    /// Simulate the authority becoming unreachable
    pub async fn set_reachable(&self, reachable: bool) {
        *self.reachable.write().await = reachable;
    }

    pub async fn persistence_mode(&self) -> PersistenceMode {
        *self.persistence.read().await
    }

    async fn check_reachable(&self) -> Result<(), AuthError> {
        if *self.reachable.read().await {
            Ok(())
        } else {
            Err(AuthError::Transport("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn set_persistence(&self, mode: PersistenceMode) -> Result<(), AuthError> {
        self.check_reachable().await?;
        *self.persistence.write().await = mode;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.check_reachable().await?;

        // Unknown user and wrong password collapse into the same error
        let user = self
            .users
            .iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        let identity = Identity {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        };

        info!("User {} signed in", identity.uid);
        *self.current.write().await = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut current = self.current.write().await;
        if let Some(identity) = current.take() {
            info!("User {} signed out", identity.uid);
        } else {
            debug!("Sign-out with no active identity");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<Identity> {
        self.current.read().await.clone()
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.check_reachable().await?;

        if self.users.iter().any(|u| u.email == email) {
            info!("Password reset email queued for {}", email);
        } else {
            // The authority does not disclose whether the account exists
            warn!("Password reset requested for unknown address");
        }
        Ok(())
    }
}
