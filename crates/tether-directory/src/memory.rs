use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;
use tether_domain::{
    Application, FederatedCredentialSpec, FederatedIdentityCredential, ObjectId, ObjectKind,
    ServicePrincipal,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::directory::Directory;
use crate::envelope::ServiceError;
use crate::error::{DirectoryError, TransportError};
use crate::lookup::{first, first_match};

#[derive(Debug, Default)]
struct Inner {
    applications: Vec<Application>,
    service_principals: Vec<ServicePrincipal>,
    credentials: HashMap<ObjectId, Vec<FederatedIdentityCredential>>,
}

/// In-process implementation of [`Directory`].
///
/// Keeps the same contracts as the Graph gateway: creates are not
/// idempotent, name lookups return the first match in creation order, and
/// deleting an unknown object is a `Request_ResourceNotFound` service error.
/// All data is lost on drop. Suitable for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn applications(&self) -> Vec<Application> {
        self.inner.read().await.applications.clone()
    }

    pub async fn service_principals(&self) -> Vec<ServicePrincipal> {
        self.inner.read().await.service_principals.clone()
    }

    pub async fn federated_credentials(&self, application_object_id: &ObjectId) -> Vec<FederatedIdentityCredential> {
        self.inner
            .read()
            .await
            .credentials
            .get(application_object_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn resource_not_found(id: &ObjectId) -> DirectoryError {
    DirectoryError::Service(ServiceError::new(
        "Request_ResourceNotFound",
        format!("Resource '{}' does not exist or one of its queried reference-property objects are not present.", id),
    ))
}

/// Cancellation check plus a yield, so concurrent callers interleave the
/// way they would against a remote service.
async fn enter(ctx: &CancellationToken) -> Result<(), DirectoryError> {
    if ctx.is_cancelled() {
        return Err(TransportError::Cancelled.into());
    }
    tokio::task::yield_now().await;
    if ctx.is_cancelled() {
        return Err(TransportError::Cancelled.into());
    }
    Ok(())
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn create_service_principal(
        &self,
        ctx: &CancellationToken,
        app_id: &str,
        tags: &[String],
    ) -> Result<ServicePrincipal, DirectoryError> {
        enter(ctx).await?;
        let mut guard = self.inner.write().await;
        let display_name = guard
            .applications
            .iter()
            .find(|a| a.app_id == app_id)
            .map(|a| a.display_name.clone())
            .ok_or_else(|| {
                DirectoryError::Service(ServiceError::new(
                    "Request_BadRequest",
                    format!(
                        "The appId '{}' of the service principal does not reference a valid application object.",
                        app_id
                    ),
                ))
            })?;
        let sp = ServicePrincipal {
            object_id: ObjectId::new(new_id()),
            app_id: app_id.to_string(),
            display_name: Some(display_name),
            tags: tags.to_vec(),
            additional_data: Map::new(),
        };
        guard.service_principals.push(sp.clone());
        Ok(sp)
    }

    async fn get_service_principal(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<ServicePrincipal, DirectoryError> {
        enter(ctx).await?;
        let guard = self.inner.read().await;
        let matches: Vec<ServicePrincipal> = guard
            .service_principals
            .iter()
            .filter(|sp| sp.display_name.as_deref() == Some(display_name))
            .cloned()
            .collect();
        first(matches).ok_or_else(|| DirectoryError::NotFound {
            kind: ObjectKind::ServicePrincipal,
            display_name: display_name.to_string(),
        })
    }

    async fn delete_service_principal(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError> {
        enter(ctx).await?;
        let mut guard = self.inner.write().await;
        let before = guard.service_principals.len();
        guard.service_principals.retain(|sp| &sp.object_id != object_id);
        if guard.service_principals.len() == before {
            return Err(resource_not_found(object_id));
        }
        Ok(())
    }

    async fn create_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError> {
        enter(ctx).await?;
        let app = Application {
            object_id: ObjectId::new(new_id()),
            app_id: new_id(),
            display_name: display_name.to_string(),
            additional_data: Map::new(),
        };
        self.inner.write().await.applications.push(app.clone());
        Ok(app)
    }

    async fn get_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError> {
        enter(ctx).await?;
        let guard = self.inner.read().await;
        let matches: Vec<Application> = guard
            .applications
            .iter()
            .filter(|a| a.display_name == display_name)
            .cloned()
            .collect();
        first(matches).ok_or_else(|| DirectoryError::NotFound {
            kind: ObjectKind::Application,
            display_name: display_name.to_string(),
        })
    }

    async fn delete_application(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError> {
        enter(ctx).await?;
        let mut guard = self.inner.write().await;
        let before = guard.applications.len();
        guard.applications.retain(|a| &a.object_id != object_id);
        if guard.applications.len() == before {
            return Err(resource_not_found(object_id));
        }
        guard.credentials.remove(object_id);
        Ok(())
    }

    async fn add_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        fic: &FederatedCredentialSpec,
    ) -> Result<(), DirectoryError> {
        enter(ctx).await?;
        let mut guard = self.inner.write().await;
        if !guard.applications.iter().any(|a| &a.object_id == application_object_id) {
            return Err(resource_not_found(application_object_id));
        }
        let existing = guard.credentials.entry(application_object_id.clone()).or_default();
        if existing.iter().any(|c| c.name == fic.name) {
            return Err(DirectoryError::Service(ServiceError::new(
                "Request_MultipleObjectsWithSameKeyValue",
                format!("FederatedIdentityCredential with name {} already exists.", fic.name),
            )));
        }
        existing.push(FederatedIdentityCredential {
            object_id: ObjectId::new(new_id()),
            name: fic.name.clone(),
            issuer: fic.issuer.clone(),
            subject: fic.subject.clone(),
            audiences: fic.audiences.clone(),
            description: fic.description.clone(),
            additional_data: Map::new(),
        });
        Ok(())
    }

    async fn get_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        issuer: &str,
        subject: &str,
    ) -> Result<FederatedIdentityCredential, DirectoryError> {
        enter(ctx).await?;
        let guard = self.inner.read().await;
        if !guard.applications.iter().any(|a| &a.object_id == application_object_id) {
            return Err(resource_not_found(application_object_id));
        }
        let by_subject: Vec<FederatedIdentityCredential> = guard
            .credentials
            .get(application_object_id)
            .map(|all| all.iter().filter(|c| c.subject == subject).cloned().collect())
            .unwrap_or_default();
        first_match(by_subject, |c| c.issuer == issuer).ok_or_else(|| {
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
        enter(ctx).await?;
        let mut guard = self.inner.write().await;
        let creds = guard
            .credentials
            .get_mut(application_object_id)
            .ok_or_else(|| resource_not_found(federated_credential_object_id))?;
        let before = creds.len();
        creds.retain(|c| &c.object_id != federated_credential_object_id);
        if creds.len() == before {
            return Err(resource_not_found(federated_credential_object_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "https://oidc.example";

    #[tokio::test]
    async fn create_application_is_not_idempotent() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let a = dir.create_application(&ctx, "foo").await.unwrap();
        let b = dir.create_application(&ctx, "foo").await.unwrap();
        assert_ne!(a.object_id, b.object_id);

        let got = dir.get_application(&ctx, "foo").await.unwrap();
        assert_eq!(got.object_id, a.object_id);
    }

    #[tokio::test]
    async fn service_principal_needs_existing_application() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let err = dir.create_service_principal(&ctx, "nope", &[]).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Service(_)));

        let app = dir.create_application(&ctx, "foo").await.unwrap();
        let sp = dir
            .create_service_principal(&ctx, &app.app_id, &["a".into()])
            .await
            .unwrap();
        let got = dir.get_service_principal(&ctx, "foo").await.unwrap();
        assert_eq!(got.object_id, sp.object_id);
        assert_eq!(got.tags, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn credential_lookup_matches_issuer_and_subject() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let app = dir.create_application(&ctx, "foo").await.unwrap();
        dir.add_federated_credential(&ctx, &app.object_id, &FederatedCredentialSpec::new("one", "https://other.example", "sub"))
            .await
            .unwrap();

        let err = dir
            .get_federated_credential(&ctx, &app.object_id, ISSUER, "sub")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::FederatedCredentialNotFound { .. }));

        dir.add_federated_credential(&ctx, &app.object_id, &FederatedCredentialSpec::new("two", ISSUER, "sub"))
            .await
            .unwrap();
        let fic = dir
            .get_federated_credential(&ctx, &app.object_id, ISSUER, "sub")
            .await
            .unwrap();
        assert_eq!(fic.name, "two");
    }

    #[tokio::test]
    async fn duplicate_credential_name_is_rejected() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let app = dir.create_application(&ctx, "foo").await.unwrap();
        let spec = FederatedCredentialSpec::new("one", ISSUER, "sub");
        dir.add_federated_credential(&ctx, &app.object_id, &spec).await.unwrap();
        let err = dir.add_federated_credential(&ctx, &app.object_id, &spec).await.unwrap_err();
        assert_eq!(
            err.service_error().map(|e| e.code.as_str()),
            Some("Request_MultipleObjectsWithSameKeyValue")
        );
    }

    #[tokio::test]
    async fn delete_unknown_is_service_error() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let err = dir.delete_application(&ctx, &ObjectId::new("x")).await.unwrap_err();
        assert_eq!(err.service_error().map(|e| e.code.as_str()), Some("Request_ResourceNotFound"));
    }

    #[tokio::test]
    async fn delete_application_drops_its_credentials() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        let app = dir.create_application(&ctx, "foo").await.unwrap();
        dir.add_federated_credential(&ctx, &app.object_id, &FederatedCredentialSpec::new("one", ISSUER, "sub"))
            .await
            .unwrap();
        dir.delete_application(&ctx, &app.object_id).await.unwrap();
        assert!(dir.federated_credentials(&app.object_id).await.is_empty());
        assert!(dir.applications().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_is_transport_cancelled() {
        let dir = InMemoryDirectory::new();
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = dir.get_application(&ctx, "foo").await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
