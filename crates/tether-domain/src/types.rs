use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::DomainError;

/// Audience every federated credential trusts unless told otherwise.
pub const DEFAULT_AUDIENCE: &str = "api://AzureADTokenExchange";

/// Open-ended map of fields the typed schema does not model.
pub type AdditionalData = Map<String, Value>;

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Server-assigned identity key of a directory object (`id` on the wire).
///
/// Deletes and nested paths always use this, never a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(s: impl Into<String>) -> Self {
        ObjectId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Application,
    ServicePrincipal,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Application => write!(f, "application"),
            ObjectKind::ServicePrincipal => write!(f, "service principal"),
        }
    }
}

// ── Directory objects ────────────────────────────────────────────────────────

/// An identity registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "id")]
    pub object_id: ObjectId,
    /// Client ID presented in tokens.
    pub app_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

/// The usable identity instance bound to an [`Application`] through `app_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    #[serde(rename = "id")]
    pub object_id: ObjectId,
    pub app_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

impl ServicePrincipal {
    /// Tags as a set; order and duplicates are irrelevant to the directory.
    pub fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.iter().map(String::as_str).collect()
    }
}

/// A trust binding scoped to an application, as returned by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentityCredential {
    #[serde(rename = "id")]
    pub object_id: ObjectId,
    #[serde(default)]
    pub name: String,
    pub issuer: String,
    pub subject: String,
    #[serde(default)]
    pub audiences: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

impl FederatedIdentityCredential {
    /// Lookup identity is the (issuer, subject) pair.
    pub fn matches(&self, issuer: &str, subject: &str) -> bool {
        self.issuer == issuer && self.subject == subject
    }
}

/// Create payload for a federated identity credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedCredentialSpec {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    pub audiences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FederatedCredentialSpec {
    pub fn new(
        name: impl Into<String>,
        issuer: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            subject: subject.into(),
            audiences: vec![DEFAULT_AUDIENCE.to_string()],
            description: None,
        }
    }

    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the constraints the directory enforces on create, so a bad
    /// declaration fails before any call is made.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_credential_name(&self.name)?;
        if !self.issuer.starts_with("https://") || self.issuer.len() <= "https://".len() {
            return Err(DomainError::InvalidIssuer(self.issuer.clone()));
        }
        if self.subject.trim().is_empty() {
            return Err(DomainError::InvalidSubject(format!(
                "credential '{}' has an empty subject",
                self.name
            )));
        }
        if self.audiences.is_empty() || self.audiences.iter().any(|a| a.trim().is_empty()) {
            return Err(DomainError::MissingAudience(self.name.clone()));
        }
        Ok(())
    }
}

fn validate_credential_name(name: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidCredentialName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if !(3..=120).contains(&name.chars().count()) {
        return Err(invalid("must be 3-120 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only letters, digits, '-' and '_' are allowed"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(invalid("must start with a letter or digit"));
    }
    Ok(())
}

/// Subject claim carried by a Kubernetes service account token.
pub fn service_account_subject(namespace: &str, name: &str) -> String {
    format!("system:serviceaccount:{}:{}", namespace, name)
}

// ── Declared state ───────────────────────────────────────────────────────────

/// A workload identity as declared by an operator: one application, its
/// service principal, and the credentials that trust external tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadIdentity {
    /// Display name of the application and its service principal.
    pub display_name: String,
    pub tags: Vec<String>,
    pub federated_credentials: Vec<FederatedCredentialSpec>,
}

impl WorkloadIdentity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            tags: Vec::new(),
            federated_credentials: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.display_name.trim().is_empty() {
            return Err(DomainError::InvalidDisplayName(
                "display name must not be empty".into(),
            ));
        }
        for fic in &self.federated_credentials {
            fic.validate()?;
        }
        Ok(())
    }
}
