// Single-session enforcement
// At most one live session per identity across devices; the latest login
// evicts earlier ones through the registrar.

pub mod monitor;
pub mod types;

pub use monitor::SessionMonitor;
pub use types::{LoginOutcome, LogoutReason, SessionError, SessionState};
