//! Flow error taxonomy

use henhouse_genai::GenerationError;
use serde::Serialize;

use crate::auth::AuthError;
use crate::db::store::StoreError;
use crate::schema::ValidationError;

/// Failure raised by a flow handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A store operation failed. Writes through the reliable writer have
    /// already been published on the error channel.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The generative provider failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The handler could not read its validated input
    #[error("Handler contract violated: {0}")]
    Contract(String),

    #[error("{0}")]
    Failed(String),
}

/// Coarse error kind, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowErrorKind {
    Validation,
    Authorization,
    IdentityNotFound,
    Persistence,
    Handler,
    UnknownFlow,
}

/// Error returned by [`FlowRunner::run`](crate::flow::FlowRunner::run).
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    /// The handler returned a value violating its output schema. This is a
    /// defect in the handler.
    #[error("Flow '{flow}' produced invalid output: {source}")]
    InvalidOutput {
        flow: String,
        source: ValidationError,
    },

    #[error("User {uid} is not authorized to run this flow")]
    Authorization { uid: String },

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Flow '{flow}' failed: {source}")]
    Handler { flow: String, source: HandlerError },
}

impl FlowError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            FlowError::UnknownFlow(_) => FlowErrorKind::UnknownFlow,
            FlowError::InvalidInput(_) | FlowError::InvalidOutput { .. } => {
                FlowErrorKind::Validation
            }
            FlowError::Authorization { .. } => FlowErrorKind::Authorization,
            FlowError::IdentityNotFound(_) => FlowErrorKind::IdentityNotFound,
            FlowError::Handler {
                source: HandlerError::Store(_),
                ..
            } => FlowErrorKind::Persistence,
            FlowError::Handler { .. } => FlowErrorKind::Handler,
        }
    }

    /// Text suitable for showing to the end user.
    ///
    /// Input and authorization failures are reported precisely. Persistence
    /// failures get a generic message; the full request context goes to
    /// `permission-error` subscribers instead.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::UnknownFlow(name) => format!("Unknown action '{}'.", name),
            FlowError::InvalidInput(err) => {
                let fields = err
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("Please check your input: {}", fields)
            }
            FlowError::Authorization { .. } => {
                "You do not have permission to perform this action.".to_string()
            }
            FlowError::IdentityNotFound(_) => {
                "Your account could not be found. Please sign in again.".to_string()
            }
            FlowError::Handler {
                source: HandlerError::Store(_),
                ..
            } => "The action failed. Please try again.".to_string(),
            FlowError::InvalidOutput { .. } | FlowError::Handler { .. } => {
                "Something went wrong while processing your request.".to_string()
            }
        }
    }

    /// The underlying store failure, if the flow failed on persistence.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            FlowError::Handler {
                source: HandlerError::Store(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}

impl From<AuthError> for FlowError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::IdentityNotFound(missing) => FlowError::IdentityNotFound(missing.uid),
            AuthError::Denied { uid } => FlowError::Authorization { uid },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityNotFound;
    use crate::schema::FieldIssue;

    #[test]
    fn test_persistence_kind_and_message() {
        let err = FlowError::Handler {
            flow: "update-user-status".into(),
            source: HandlerError::Store(StoreError::ConnectionLost("offline".into())),
        };
        assert_eq!(err.kind(), FlowErrorKind::Persistence);
        assert_eq!(err.user_message(), "The action failed. Please try again.");
        assert_eq!(
            err.store_error(),
            Some(&StoreError::ConnectionLost("offline".into()))
        );
    }

    #[test]
    fn test_validation_message_names_fields() {
        let err = FlowError::InvalidInput(ValidationError {
            schema: "answer-question.input".into(),
            issues: vec![FieldIssue {
                path: "query".into(),
                message: "\"query\" is a required property".into(),
            }],
        });
        assert_eq!(err.kind(), FlowErrorKind::Validation);
        assert!(err.user_message().contains("query"));
    }

    #[test]
    fn test_auth_error_conversion() {
        let denied: FlowError = AuthError::Denied { uid: "u1".into() }.into();
        assert_eq!(denied.kind(), FlowErrorKind::Authorization);

        let missing: FlowError = AuthError::IdentityNotFound(IdentityNotFound {
            uid: "ghost".into(),
        })
        .into();
        assert!(matches!(missing, FlowError::IdentityNotFound(uid) if uid == "ghost"));
    }
}
