use async_trait::async_trait;
use tether_domain::{
    Application, FederatedCredentialSpec, FederatedIdentityCredential, ObjectId, ServicePrincipal,
};
use tokio_util::sync::CancellationToken;

use crate::error::DirectoryError;

/// The operations identity-federation lifecycle management needs, and no
/// more.
///
/// Creates are not idempotent: calling one twice makes two objects. Callers
/// that need idempotency look up first (see `tether-reconciler`). Every call
/// takes its own cancellable context; cancelling it yields
/// [`TransportError::Cancelled`](crate::TransportError::Cancelled).
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    // ── Service principals ────────────────────────────────────────────────────

    /// Create a service principal bound to `app_id`. No secret or
    /// certificate is generated.
    async fn create_service_principal(
        &self,
        ctx: &CancellationToken,
        app_id: &str,
        tags: &[String],
    ) -> Result<ServicePrincipal, DirectoryError>;

    /// First service principal whose display name equals `display_name`.
    async fn get_service_principal(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<ServicePrincipal, DirectoryError>;

    async fn delete_service_principal(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError>;

    // ── Applications ──────────────────────────────────────────────────────────

    async fn create_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError>;

    /// First application whose display name equals `display_name`.
    async fn get_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Application, DirectoryError>;

    async fn delete_application(
        &self,
        ctx: &CancellationToken,
        object_id: &ObjectId,
    ) -> Result<(), DirectoryError>;

    // ── Federated identity credentials ────────────────────────────────────────

    async fn add_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        fic: &FederatedCredentialSpec,
    ) -> Result<(), DirectoryError>;

    /// The credential on the application whose issuer and subject both
    /// match.
    async fn get_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        issuer: &str,
        subject: &str,
    ) -> Result<FederatedIdentityCredential, DirectoryError>;

    async fn delete_federated_credential(
        &self,
        ctx: &CancellationToken,
        application_object_id: &ObjectId,
        federated_credential_object_id: &ObjectId,
    ) -> Result<(), DirectoryError>;
}
