use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("invalid federated credential name '{name}': {reason}")]
    InvalidCredentialName { name: String, reason: String },

    #[error("invalid issuer '{0}': must be an https URL")]
    InvalidIssuer(String),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    #[error("federated credential '{0}' has no audiences")]
    MissingAudience(String),
}
