use serde::{Deserialize, Serialize};
use tether_directory::CloudEnvironment;

/// Raw YAML representation of a tether file.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawFile {
    pub directory: Option<RawDirectory>,
    #[serde(default)]
    pub identities: Vec<RawIdentity>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawDirectory {
    /// `public` (default), `usgov` or `china`.
    pub cloud: Option<CloudEnvironment>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawIdentity {
    /// Application (and service principal) display name.
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub federated_credentials: Vec<RawCredential>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawCredential {
    pub name: String,
    pub issuer: String,
    /// Exactly one of `subject` and `service_account` must be set.
    pub subject: Option<String>,
    pub service_account: Option<RawServiceAccount>,
    /// Absent means the default token-exchange audience.
    pub audiences: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawServiceAccount {
    pub namespace: String,
    pub name: String,
}
