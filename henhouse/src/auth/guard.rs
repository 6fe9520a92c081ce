//! Authorization guard for privileged flows
//!
//! Resolves the claimed uid, then checks the verified email against the
//! configured allowlist. The guard touches nothing but the identity
//! verifier, so a rejection happens before any privileged read or write.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::identity::{Identity, IdentityNotFound, IdentityVerifier};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    IdentityNotFound(#[from] IdentityNotFound),

    #[error("User {uid} is not authorized for this action")]
    Denied { uid: String },
}

/// Who may run privileged flows.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    allowed_emails: HashSet<String>,
}

impl AdminPolicy {
    /// Build from verified emails. Comparison is case-insensitive.
    pub fn new<I, S>(allowed_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_emails: allowed_emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn allows(&self, identity: &Identity) -> bool {
        self.allowed_emails
            .contains(&normalize(&identity.verified_email))
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_emails.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks claimed identities against an [`AdminPolicy`].
#[derive(Clone)]
pub struct AuthorizationGuard {
    verifier: Arc<dyn IdentityVerifier>,
    policy: AdminPolicy,
}

impl AuthorizationGuard {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, policy: AdminPolicy) -> Self {
        Self { verifier, policy }
    }

    pub async fn authorize(&self, claimed_uid: &str) -> Result<Identity, AuthError> {
        let identity = self.verifier.resolve(claimed_uid).await.map_err(|e| {
            warn!(uid = %claimed_uid, "Authorization failed: unknown identity");
            e
        })?;

        if !self.policy.allows(&identity) {
            warn!(uid = %claimed_uid, "Authorization denied");
            return Err(AuthError::Denied {
                uid: claimed_uid.to_string(),
            });
        }

        debug!(uid = %claimed_uid, "Authorized");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::IdentityDirectory;

    fn guard() -> AuthorizationGuard {
        let directory = IdentityDirectory::new();
        directory.insert("admin-1", "Ops@Henhouse.example");
        directory.insert("farmer-1", "farmer@example.com");
        AuthorizationGuard::new(
            Arc::new(directory),
            AdminPolicy::new(["ops@henhouse.example"]),
        )
    }

    #[tokio::test]
    async fn test_admin_allowed_case_insensitive() {
        let identity = guard().authorize("admin-1").await.unwrap();
        assert_eq!(identity.uid, "admin-1");
    }

    #[tokio::test]
    async fn test_non_admin_denied() {
        let err = guard().authorize("farmer-1").await.unwrap_err();
        assert_eq!(err, AuthError::Denied { uid: "farmer-1".into() });
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let err = guard().authorize("ghost").await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityNotFound(_)));
    }

    #[test]
    fn test_blank_emails_ignored() {
        let policy = AdminPolicy::new(["  ", ""]);
        assert!(policy.is_empty());
    }
}
