// Session-uniqueness enforcement and persisted-state reconciliation for the
// Essência wellness app: at most one live session per identity across
// devices, plus a best-effort local snapshot of user progress.

pub mod auth;
pub mod config;
pub mod registrar;
pub mod session;
pub mod state;
pub mod store;
