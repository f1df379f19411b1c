use std::collections::HashSet;
use std::path::Path;

use tether_directory::CloudEnvironment;
use tether_domain::{service_account_subject, FederatedCredentialSpec, WorkloadIdentity};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::{RawCredential, RawDirectory, RawFile, RawIdentity};

/// Directory settings carried by the file. Command-line flags win over
/// these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySettings {
    pub cloud: Option<CloudEnvironment>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TetherConfig {
    pub directory: DirectorySettings,
    pub identities: Vec<WorkloadIdentity>,
}

/// Read and validate a tether file.
///
/// ```text
/// directory:
///   cloud: public
///   tenant_id: <guid>
/// identities:
///   - name: payments-ci
///     tags: [tether]
///     federated_credentials:
///       - name: gh-main
///         issuer: https://token.actions.githubusercontent.com
///         subject: repo:acme/payments:ref:refs/heads/main
/// ```
pub fn load_file(path: &Path) -> Result<TetherConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!("Loading identities from {}", path.display());
    parse_str(&content, &path.display().to_string())
}

/// Parse file content; `origin` labels errors.
pub fn parse_str(content: &str, origin: &str) -> Result<TetherConfig, ConfigError> {
    let raw: RawFile = serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        path: origin.to_string(),
        source: e,
    })?;

    let directory = raw.directory.map(convert_directory).unwrap_or_default();

    let mut seen = HashSet::new();
    let mut identities = Vec::with_capacity(raw.identities.len());
    for raw_identity in raw.identities {
        if !seen.insert(raw_identity.name.clone()) {
            return Err(conversion(origin, format!("duplicate identity '{}'", raw_identity.name)));
        }
        identities.push(convert_identity(raw_identity, origin)?);
    }
    debug!("Loaded {} identities from {}", identities.len(), origin);

    Ok(TetherConfig { directory, identities })
}

fn convert_directory(raw: RawDirectory) -> DirectorySettings {
    DirectorySettings { cloud: raw.cloud, tenant_id: raw.tenant_id }
}

fn convert_identity(raw: RawIdentity, origin: &str) -> Result<WorkloadIdentity, ConfigError> {
    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    let mut credentials = Vec::with_capacity(raw.federated_credentials.len());

    for raw_cred in raw.federated_credentials {
        let spec = convert_credential(raw_cred, &raw.name, origin)?;
        if !names.insert(spec.name.clone()) {
            return Err(conversion(
                origin,
                format!("identity '{}': duplicate credential name '{}'", raw.name, spec.name),
            ));
        }
        if !keys.insert((spec.issuer.clone(), spec.subject.clone())) {
            return Err(conversion(
                origin,
                format!(
                    "identity '{}': credential '{}' repeats issuer '{}' and subject '{}'",
                    raw.name, spec.name, spec.issuer, spec.subject
                ),
            ));
        }
        credentials.push(spec);
    }

    let identity = WorkloadIdentity {
        display_name: raw.name,
        tags: raw.tags,
        federated_credentials: credentials,
    };
    identity.validate().map_err(|e| ConfigError::Domain {
        path: origin.to_string(),
        source: e,
    })?;
    Ok(identity)
}

fn convert_credential(
    raw: RawCredential,
    identity: &str,
    origin: &str,
) -> Result<FederatedCredentialSpec, ConfigError> {
    let subject = match (raw.subject, raw.service_account) {
        (Some(s), None) => s,
        (None, Some(sa)) => service_account_subject(&sa.namespace, &sa.name),
        (Some(_), Some(_)) => {
            return Err(conversion(
                origin,
                format!(
                    "identity '{}': credential '{}' sets both subject and service_account",
                    identity, raw.name
                ),
            ))
        }
        (None, None) => {
            return Err(conversion(
                origin,
                format!(
                    "identity '{}': credential '{}' needs a subject or a service_account",
                    identity, raw.name
                ),
            ))
        }
    };

    let mut spec = FederatedCredentialSpec::new(raw.name, raw.issuer, subject);
    if let Some(audiences) = raw.audiences {
        spec = spec.with_audiences(audiences);
    }
    if let Some(description) = raw.description {
        spec = spec.with_description(description);
    }
    Ok(spec)
}

fn conversion(origin: &str, message: String) -> ConfigError {
    ConfigError::Conversion { path: origin.to_string(), message }
}
