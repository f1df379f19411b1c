use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tether_domain::{
    Application, FederatedCredentialSpec, FederatedIdentityCredential, ObjectId, ObjectKind,
    ServicePrincipal,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::directory::Directory;
use crate::envelope::classify;
use crate::error::{DirectoryError, TransportError};
use crate::filter::Filter;
use crate::lookup::{first, first_match};
use crate::transport::{DirectoryTransport, GraphRequest, GraphResponse, HttpTransport};

const APPLICATIONS: &str = "/applications";
const SERVICE_PRINCIPALS: &str = "/servicePrincipals";

/// Collection response: `{ "value": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// [`Directory`] backed by the Graph REST API.
///
/// Each operation is exactly one transport call. The response envelope is
/// classified before any typed field is read, so a body-level error is
/// never mistaken for a result or for "not found".
pub struct GraphDirectory {
    transport: Arc<dyn DirectoryTransport>,
}

impl GraphDirectory {
    pub fn new(transport: Arc<dyn DirectoryTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new(config)))
    }

    async fn call(
        &self,
        ctx: &CancellationToken,
        request: GraphRequest,
    ) -> Result<GraphResponse, DirectoryError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }
        tokio::select! {
            biased;
            () = ctx.cancelled() => Err(TransportError::Cancelled.into()),
            res = self.transport.send(request) => res.map_err(DirectoryError::from),
        }
    }

    /// Classify the envelope, then check the status. Returns the object body.
    fn checked_object(resp: GraphResponse) -> Result<Map<String, Value>, DirectoryError> {
        let success = resp.is_success();
        match resp.body {
            Value::Object(map) => {
                if let Some(err) = classify(&map).into_result()? {
                    return Err(DirectoryError::Service(err));
                }
                if !success {
                    return Err(TransportError::Status {
                        status: resp.status,
                        body: Value::Object(map).to_string(),
                    }
                    .into());
                }
                Ok(map)
            }
            other if !success => Err(TransportError::Status {
                status: resp.status,
                body: body_text(other),
            }
            .into()),
            Value::Null => Err(DirectoryError::Decode("empty response body".into())),
            other => Err(DirectoryError::Decode(format!(
                "expected a JSON object, got: {}",
                body_text(other)
            ))),
        }
    }

    fn decode<T: DeserializeOwned>(resp: GraphResponse) -> Result<T, DirectoryError> {
        let map = Self::checked_object(resp)?;
        serde_json::from_value(Value::Object(map)).map_err(|e| DirectoryError::Decode(e.to_string()))
    }

    /// Deletes answer 204 with no body; anything carrying a body is still
    /// classified.
    fn expect_no_content(resp: GraphResponse) -> Result<(), DirectoryError> {
        if resp.body.is_null() {
            if resp.is_success() {
                return Ok(());
            }
            return Err(TransportError::Status { status: resp.status, body: String::new() }.into());
        }
        Self::checked_object(resp).map(|_| ())
    }
}

fn body_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn application_path(object_id: &ObjectId) -> String {
    format!("{}/{}", APPLICATIONS, object_id)
}

fn federated_credentials_path(application_object_id: &ObjectId) -> String {
    format!("{}/federatedIdentityCredentials", application_path(application_object_id))
}

#[async_trait]
impl Directory for GraphDirectory {
    async fn create_service_principal(
        &self,
        ctx: &CancellationToken,
        app_id: &str,
        tags: &[String],
    ) -> Result<ServicePrincipal, DirectoryError> {
        debug!(app_id, "Creating service principal for application");
        let body = json!({ "appId": app_id, "tags": tags });
        let resp = self.call(ctx, GraphRequest::post(SERVICE_PRINCIPALS, body)).await?;
        Self::decode(resp)
    }

    async fn get_service_principal(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<ServicePrincipal, DirectoryError> {
        debug!(display_name, "Getting service principal");
        let req = GraphRequest::get(SERVICE_PRINCIPALS).with_filter(Filter::display_name(display_name));
        let resp = self.call(ctx, req).await?;
        let found: Collection<ServicePrincipal> = Self::decode(resp)?;
        first(found.value).ok_or_else(|| DirectoryError::NotFound {
            kind: ObjectKind::ServicePrincipal,
            display_name: display_name.to_string(),
        })
    }

    async fn delete_service_principal(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError> {
        debug!(%object_id, "Deleting service principal");
        let path = format!("{}/{}", SERVICE_PRINCIPALS, object_id);
        let resp = self.call(ctx, GraphRequest::delete(path)).await?;
        Self::expect_no_content(resp)
    }

    async fn create_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError> {
        debug!(display_name, "Creating application");
        let body = json!({ "displayName": display_name });
        let resp = self.call(ctx, GraphRequest::post(APPLICATIONS, body)).await?;
        Self::decode(resp)
    }

    async fn get_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError> {
        debug!(display_name, "Getting application");
        let req = GraphRequest::get(APPLICATIONS).with_filter(Filter::display_name(display_name));
        let resp = self.call(ctx, req).await?;
        let found: Collection<Application> = Self::decode(resp)?;
        first(found.value).ok_or_else(|| DirectoryError::NotFound {
            kind: ObjectKind::Application,
            display_name: display_name.to_string(),
        })
    }

    async fn delete_application(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError> {
        debug!(%object_id, "Deleting application");
        let resp = self.call(ctx, GraphRequest::delete(application_path(object_id))).await?;
        Self::expect_no_content(resp)
    }

    async fn add_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        fic: &FederatedCredentialSpec,
    ) -> Result<(), DirectoryError> {
        debug!(%application_object_id, name = %fic.name, "Adding federated credential");
        let body = serde_json::to_value(fic).map_err(|e| DirectoryError::Decode(e.to_string()))?;
        let req = GraphRequest::post(federated_credentials_path(application_object_id), body);
        let resp = self.call(ctx, req).await?;
        Self::checked_object(resp).map(|_| ())
    }

    async fn get_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        issuer: &str,
        subject: &str,
    ) -> Result<FederatedIdentityCredential, DirectoryError> {
        debug!(%application_object_id, issuer, subject, "Getting federated credential");
        // Only one field can be filtered server-side; issuer is checked here.
        let req = GraphRequest::get(federated_credentials_path(application_object_id))
            .with_filter(Filter::subject(subject));
        let resp = self.call(ctx, req).await?;
        let found: Collection<FederatedIdentityCredential> = Self::decode(resp)?;
        first_match(found.value, |fic| fic.matches(issuer, subject)).ok_or_else(|| {
            DirectoryError::FederatedCredentialNotFound {
                issuer: issuer.to_string(),
                subject: subject.to_string(),
            }
        })
    }

    async fn delete_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        federated_credential_object_id: &ObjectId,
    ) -> Result<(), DirectoryError> {
        debug!(%application_object_id, %federated_credential_object_id, "Deleting federated credential");
        let path = format!(
            "{}/{}",
            federated_credentials_path(application_object_id),
            federated_credential_object_id
        );
        let resp = self.call(ctx, GraphRequest::delete(path)).await?;
        Self::expect_no_content(resp)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
