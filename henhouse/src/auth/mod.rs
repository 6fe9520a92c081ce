//! Authentication and authorization for Henhouse
//!
//! Provides:
//! - Identity verification (claimed uid -> verified identity)
//! - The authorization guard for privileged flows

pub mod guard;
pub mod identity;

pub use guard::{AdminPolicy, AuthError, AuthorizationGuard};
pub use identity::{Identity, IdentityDirectory, IdentityNotFound, IdentityVerifier};
