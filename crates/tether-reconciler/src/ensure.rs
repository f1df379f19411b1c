//! Lookup-or-create composites.
//!
//! The directory's create calls are not idempotent. These operations are:
//! each looks up first, creates only on the typed not-found sentinel, and
//! holds a [`CreationLocks`](crate::CreationLocks) entry across both steps.
//! Any other error, including a service error or cancellation, propagates
//! without creating anything.

use tether_directory::{CancellationToken, DirectoryError};
use tether_domain::{Application, FederatedCredentialSpec, FederatedIdentityCredential, ServicePrincipal};
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::reconcile::Reconciler;

#[derive(Debug, Clone, PartialEq)]
pub enum Ensured<T> {
    Existing(T),
    Created(T),
}

impl<T> Ensured<T> {
    pub fn get(&self) -> &T {
        match self {
            Ensured::Existing(v) | Ensured::Created(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Ensured::Existing(v) | Ensured::Created(v) => v,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }
}

/// `Ok(None)` for the not-found sentinels, everything else unchanged.
pub(crate) fn found<T>(res: Result<T, DirectoryError>) -> Result<Option<T>, DirectoryError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

impl Reconciler {
    pub async fn ensure_application(
        &self,
        ctx: &CancellationToken,
        display_name: &str,
    ) -> Result<Ensured<Application>, ReconcileError> {
        let _guard = self.locks.lock(format!("application:{}", display_name)).await;

        if let Some(app) = found(self.directory.get_application(ctx, display_name).await)? {
            debug!(display_name, object_id = %app.object_id, "application exists");
            return Ok(Ensured::Existing(app));
        }
        let app = self.directory.create_application(ctx, display_name).await?;
        info!(display_name, object_id = %app.object_id, app_id = %app.app_id, "created application");
        Ok(Ensured::Created(app))
    }

    /// The principal is found by the application's display name and must
    /// carry the application's `appId`.
    pub async fn ensure_service_principal(
        &self,
        ctx: &CancellationToken,
        application: &Application,
        tags: &[String],
    ) -> Result<Ensured<ServicePrincipal>, ReconcileError> {
        let display_name = application.display_name.as_str();
        let _guard = self.locks.lock(format!("servicePrincipal:{}", display_name)).await;

        if let Some(sp) = found(self.directory.get_service_principal(ctx, display_name).await)? {
            if sp.app_id != application.app_id {
                return Err(ReconcileError::AppIdMismatch {
                    display_name: display_name.to_string(),
                    expected: application.app_id.clone(),
                    found: sp.app_id,
                });
            }
            let want: std::collections::BTreeSet<&str> = tags.iter().map(String::as_str).collect();
            if sp.tag_set() != want {
                warn!(display_name, object_id = %sp.object_id, "service principal tags differ from declaration; not updated");
            }
            debug!(display_name, object_id = %sp.object_id, "service principal exists");
            return Ok(Ensured::Existing(sp));
        }
        let sp = self
            .directory
            .create_service_principal(ctx, &application.app_id, tags)
            .await?;
        info!(display_name, object_id = %sp.object_id, "created service principal");
        Ok(Ensured::Created(sp))
    }

    /// Identity is (issuer, subject); the credential name plays no part in
    /// the lookup.
    pub async fn ensure_federated_credential(
        &self,
        ctx: &CancellationToken,
        application: &Application,
        spec: &FederatedCredentialSpec,
    ) -> Result<Ensured<FederatedIdentityCredential>, ReconcileError> {
        let app_id = &application.object_id;
        let _guard = self
            .locks
            .lock(format!("federatedCredential:{}:{}:{}", app_id, spec.issuer, spec.subject))
            .await;

        let lookup = self
            .directory
            .get_federated_credential(ctx, app_id, &spec.issuer, &spec.subject)
            .await;
        if let Some(fic) = found(lookup)? {
            debug!(object_id = %fic.object_id, issuer = %spec.issuer, subject = %spec.subject, "federated credential exists");
            return Ok(Ensured::Existing(fic));
        }

        self.directory.add_federated_credential(ctx, app_id, spec).await?;
        let fic = self
            .directory
            .get_federated_credential(ctx, app_id, &spec.issuer, &spec.subject)
            .await?;
        info!(
            application = %application.display_name,
            object_id = %fic.object_id,
            issuer = %spec.issuer,
            subject = %spec.subject,
            "added federated credential"
        );
        Ok(Ensured::Created(fic))
    }
}
