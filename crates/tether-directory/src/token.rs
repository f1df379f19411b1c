use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::error::TransportError;

/// Source of bearer tokens for the directory. Failures surface as
/// [`TransportError::Token`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, TransportError>;
}

/// Pick a provider for `config`: client credentials when both id and
/// secret are set, the Azure CLI login otherwise.
pub fn provider_for(config: &DirectoryConfig, client: reqwest::Client) -> Box<dyn TokenProvider> {
    match (config.client_id.as_deref(), config.client_secret.as_deref()) {
        (Some(cid), Some(cs)) => Box::new(ClientSecretTokenProvider {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                config.cloud.login_endpoint(),
                config.tenant_id
            ),
            client_id: cid.to_string(),
            client_secret: cs.to_string(),
            scope: config.scope(),
            client,
            cache: Mutex::new(None),
        }),
        _ => Box::new(AzureCliTokenProvider {
            tenant_id: config.tenant_id.clone(),
            resource: config.cloud.graph_endpoint().to_string(),
        }),
    }
}

// ── Client credentials ───────────────────────────────────────────────────────

pub struct ClientSecretTokenProvider {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    client: reqwest::Client,
    cache: Mutex<Option<(String, Instant)>>,
}

impl ClientSecretTokenProvider {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            client: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for ClientSecretTokenProvider {
    async fn token(&self) -> Result<String, TransportError> {
        let mut guard = self.cache.lock().await;
        if let Some((tok, expiry)) = guard.as_ref() {
            if Instant::now() < *expiry {
                return Ok(tok.clone());
            }
        }

        debug!(url = %self.token_url, "requesting client credentials token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let resp: Value = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TransportError::Token(format!("token request: {}", e)))?
            .json()
            .await
            .map_err(|e| TransportError::Token(format!("token decode: {}", e)))?;

        let tok = resp["access_token"]
            .as_str()
            .ok_or_else(|| {
                let reason = resp["error_description"]
                    .as_str()
                    .or_else(|| resp["error"].as_str())
                    .unwrap_or("no access_token in response");
                TransportError::Token(reason.to_string())
            })?
            .to_string();
        let expires_in = resp["expires_in"].as_u64().unwrap_or(3600);
        let expiry = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));

        *guard = Some((tok.clone(), expiry));
        Ok(tok)
    }
}

// ── Azure CLI ────────────────────────────────────────────────────────────────

pub struct AzureCliTokenProvider {
    tenant_id: String,
    resource: String,
}

#[async_trait]
impl TokenProvider for AzureCliTokenProvider {
    async fn token(&self) -> Result<String, TransportError> {
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--tenant",
                &self.tenant_id,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| {
                TransportError::Token(format!(
                    "az CLI not found: {}. Install Azure CLI or pass client credentials.",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Token(format!(
                "az account get-access-token failed: {}. Run 'az login' first.",
                stderr.trim()
            )));
        }

        let resp: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| TransportError::Token(format!("az CLI output parse: {}", e)))?;
        resp["accessToken"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TransportError::Token("az CLI: no accessToken in output".into()))
    }
}

// ── Static ───────────────────────────────────────────────────────────────────

pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, TransportError> {
        Ok(self.0.clone())
    }
}
