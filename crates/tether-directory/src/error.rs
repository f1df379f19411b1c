use tether_domain::ObjectKind;
use thiserror::Error;

use crate::envelope::ServiceError;

/// Failure to reach the directory or to get a usable answer at the HTTP
/// layer. Never retried here.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("{verb} {url}: {source}")]
    Request {
        verb: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token acquisition failed: {0}")]
    Token(String),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response envelope carried a structured error, whatever the
    /// HTTP status was.
    #[error("directory service error: {0}")]
    Service(ServiceError),

    #[error("{kind} with display name '{display_name}' not found")]
    NotFound {
        kind: ObjectKind,
        display_name: String,
    },

    #[error("federated credential not found (issuer '{issuer}', subject '{subject}')")]
    FederatedCredentialNotFound { issuer: String, subject: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// True for the "zero matching results" sentinels only.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::NotFound { .. } | DirectoryError::FederatedCredentialNotFound { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DirectoryError::Transport(TransportError::Cancelled))
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            DirectoryError::Service(e) => Some(e),
            _ => None,
        }
    }
}
