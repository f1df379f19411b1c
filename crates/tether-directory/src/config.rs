use std::time::Duration;

use serde::{Deserialize, Serialize};

/// National cloud the directory lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudEnvironment {
    #[default]
    Public,
    UsGov,
    China,
}

impl CloudEnvironment {
    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://graph.microsoft.com",
            CloudEnvironment::UsGov => "https://graph.microsoft.us",
            CloudEnvironment::China => "https://microsoftgraph.chinacloudapi.cn",
        }
    }

    pub fn login_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://login.microsoftonline.com",
            CloudEnvironment::UsGov => "https://login.microsoftonline.us",
            CloudEnvironment::China => "https://login.chinacloudapi.cn",
        }
    }
}

impl std::fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudEnvironment::Public => write!(f, "public"),
            CloudEnvironment::UsGov => write!(f, "usgov"),
            CloudEnvironment::China => write!(f, "china"),
        }
    }
}

/// Operator-level settings for reaching the directory. Injected by the
/// caller; nothing here is read from the environment.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub tenant_id: String,
    pub cloud: CloudEnvironment,
    /// Overrides the cloud's Graph endpoint (e.g. a proxy).
    pub graph_endpoint: Option<String>,
    pub api_version: String,
    /// Client credentials; when absent the Azure CLI login is used.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            cloud: CloudEnvironment::default(),
            graph_endpoint: None,
            api_version: "v1.0".into(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Root every resource path is appended to, e.g.
    /// `https://graph.microsoft.com/v1.0`.
    pub fn base_url(&self) -> String {
        let endpoint = self
            .graph_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.graph_endpoint())
            .trim_end_matches('/');
        format!("{}/{}", endpoint, self.api_version)
    }

    /// OAuth scope for tokens presented to the Graph endpoint.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.cloud.graph_endpoint())
    }
}
