// Authentication authority seam
// The app never owns credentials or identities; it talks to an external
// authority through the AuthProvider trait.

pub mod provider;

pub use provider::{
    AuthError, AuthProvider, Identity, MockAuthProvider, MockUser, PersistenceMode,
};
