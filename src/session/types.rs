// Session state machine types

use crate::auth::{AuthError, Identity};

/// Wire value of the concurrent-login logout reason flag
pub const CONCURRENT_LOGIN: &str = "concurrent_login";

/// Monitor state machine. A forced invalidation folds straight back to
/// `Unauthenticated` once its reason has been captured in the one-shot flag,
/// so there is no observable `Invalidated` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity session
    Unauthenticated,
    /// Credential verification in flight; further submits are rejected
    Authenticating,
    /// Live session holding the locally minted token
    Authenticated { session_id: String },
}

/// Why the previous session ended, shown one-shot on the next login screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// A different device established a newer session for this identity
    ConcurrentLogin,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::ConcurrentLogin => CONCURRENT_LOGIN,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            CONCURRENT_LOGIN => Some(LogoutReason::ConcurrentLogin),
            _ => None,
        }
    }
}

/// Successful login result. `registrar_degraded` is set when the session
/// write or subscription could not be established after retries: the user is
/// logged in locally but cross-device enforcement is weakened until the next
/// successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub session_id: String,
    pub registrar_degraded: bool,
}

/// Session errors, classified for user display
#[derive(Debug, Clone)]
pub enum SessionError {
    /// Wrong email or password; never reveals which
    InvalidCredentials,
    /// Authentication backend unreachable or misconfigured
    Transport(String),
    /// A login for this monitor is already in flight
    LoginInFlight,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidCredentials => write!(f, "Incorrect email or password"),
            SessionError::Transport(msg) => {
                write!(f, "Something went wrong, check your connection: {}", msg)
            }
            SessionError::LoginInFlight => write!(f, "A login is already in progress"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<AuthError> for SessionError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => SessionError::InvalidCredentials,
            AuthError::Transport(msg) => SessionError::Transport(msg),
        }
    }
}
