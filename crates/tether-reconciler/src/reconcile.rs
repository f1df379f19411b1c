use std::sync::Arc;

use chrono::Utc;
use tether_directory::{CancellationToken, Directory};
use tether_domain::{Application, WorkloadIdentity};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ensure::found;
use crate::error::ReconcileError;
use crate::locks::CreationLocks;
use crate::report::{Action, Change, IdentityFailure, ReconcileReport, ReconcileRequest};

/// Drives a [`Directory`] towards declared workload identities.
///
/// Cloning is cheap; clones share the directory and the creation locks.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) locks: CreationLocks,
}

impl Reconciler {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory, locks: CreationLocks::new() }
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Application, then service principal, then each credential. Changes
    /// made before a failure stay in `changes`.
    pub async fn provision(
        &self,
        ctx: &CancellationToken,
        identity: &WorkloadIdentity,
        dry_run: bool,
        changes: &mut Vec<Change>,
    ) -> Result<(), ReconcileError> {
        if dry_run {
            return self.plan_provision(ctx, identity, changes).await;
        }
        let name = identity.display_name.clone();

        let app = self.ensure_application(ctx, &name).await?;
        changes.push(if app.was_created() {
            Change::ApplicationCreated { display_name: name.clone(), object_id: Some(app.get().object_id.clone()) }
        } else {
            Change::ApplicationUnchanged { display_name: name.clone(), object_id: app.get().object_id.clone() }
        });
        let app = app.into_inner();

        let sp = self.ensure_service_principal(ctx, &app, &identity.tags).await?;
        changes.push(if sp.was_created() {
            Change::ServicePrincipalCreated { display_name: name.clone(), object_id: Some(sp.get().object_id.clone()) }
        } else {
            Change::ServicePrincipalUnchanged { display_name: name.clone(), object_id: sp.get().object_id.clone() }
        });

        for spec in &identity.federated_credentials {
            let fic = self.ensure_federated_credential(ctx, &app, spec).await?;
            changes.push(if fic.was_created() {
                Change::FederatedCredentialAdded {
                    display_name: name.clone(),
                    name: spec.name.clone(),
                    issuer: spec.issuer.clone(),
                    subject: spec.subject.clone(),
                    object_id: Some(fic.get().object_id.clone()),
                }
            } else {
                Change::FederatedCredentialUnchanged {
                    display_name: name.clone(),
                    name: fic.get().name.clone(),
                    object_id: fic.get().object_id.clone(),
                }
            });
        }
        Ok(())
    }

    async fn plan_provision(
        &self,
        ctx: &CancellationToken,
        identity: &WorkloadIdentity,
        changes: &mut Vec<Change>,
    ) -> Result<(), ReconcileError> {
        let name = identity.display_name.clone();
        let Some(app) = found(self.directory.get_application(ctx, &name).await)? else {
            changes.push(Change::ApplicationCreated { display_name: name.clone(), object_id: None });
            changes.push(Change::ServicePrincipalCreated { display_name: name.clone(), object_id: None });
            for spec in &identity.federated_credentials {
                changes.push(planned_credential(&name, spec));
            }
            return Ok(());
        };
        changes.push(Change::ApplicationUnchanged { display_name: name.clone(), object_id: app.object_id.clone() });

        match found(self.directory.get_service_principal(ctx, &name).await)? {
            Some(sp) if sp.app_id != app.app_id => {
                return Err(ReconcileError::AppIdMismatch {
                    display_name: name,
                    expected: app.app_id,
                    found: sp.app_id,
                });
            }
            Some(sp) => changes.push(Change::ServicePrincipalUnchanged {
                display_name: name.clone(),
                object_id: sp.object_id,
            }),
            None => changes.push(Change::ServicePrincipalCreated { display_name: name.clone(), object_id: None }),
        }

        for spec in &identity.federated_credentials {
            let lookup = self
                .directory
                .get_federated_credential(ctx, &app.object_id, &spec.issuer, &spec.subject)
                .await;
            changes.push(match found(lookup)? {
                Some(fic) => Change::FederatedCredentialUnchanged {
                    display_name: name.clone(),
                    name: fic.name,
                    object_id: fic.object_id,
                },
                None => planned_credential(&name, spec),
            });
        }
        Ok(())
    }

    /// Credentials, then the service principal, then the application. An
    /// absent application ends the teardown with `IdentityAbsent`.
    pub async fn teardown(
        &self,
        ctx: &CancellationToken,
        identity: &WorkloadIdentity,
        dry_run: bool,
        changes: &mut Vec<Change>,
    ) -> Result<(), ReconcileError> {
        let name = identity.display_name.clone();
        let Some(app) = found(self.directory.get_application(ctx, &name).await)? else {
            debug!(display_name = %name, "application absent, nothing to tear down");
            changes.push(Change::IdentityAbsent { display_name: name });
            return Ok(());
        };

        for spec in &identity.federated_credentials {
            let lookup = self
                .directory
                .get_federated_credential(ctx, &app.object_id, &spec.issuer, &spec.subject)
                .await;
            let Some(fic) = found(lookup)? else { continue };
            if !dry_run {
                self.directory
                    .delete_federated_credential(ctx, &app.object_id, &fic.object_id)
                    .await?;
                info!(display_name = %name, object_id = %fic.object_id, "deleted federated credential");
            }
            changes.push(Change::FederatedCredentialDeleted {
                display_name: name.clone(),
                name: fic.name,
                object_id: fic.object_id,
            });
        }

        self.teardown_service_principal(ctx, &app, dry_run, changes).await?;

        if !dry_run {
            self.directory.delete_application(ctx, &app.object_id).await?;
            info!(display_name = %name, object_id = %app.object_id, "deleted application");
        }
        changes.push(Change::ApplicationDeleted { display_name: name, object_id: app.object_id });
        Ok(())
    }

    async fn teardown_service_principal(
        &self,
        ctx: &CancellationToken,
        app: &Application,
        dry_run: bool,
        changes: &mut Vec<Change>,
    ) -> Result<(), ReconcileError> {
        let name = &app.display_name;
        let Some(sp) = found(self.directory.get_service_principal(ctx, name).await)? else {
            return Ok(());
        };
        if sp.app_id != app.app_id {
            warn!(
                display_name = %name,
                object_id = %sp.object_id,
                app_id = %sp.app_id,
                "service principal belongs to another application; left in place"
            );
            return Ok(());
        }
        if !dry_run {
            self.directory.delete_service_principal(ctx, &sp.object_id).await?;
            info!(display_name = %name, object_id = %sp.object_id, "deleted service principal");
        }
        changes.push(Change::ServicePrincipalDeleted { display_name: name.clone(), object_id: sp.object_id });
        Ok(())
    }

    /// Run `req.action` for every identity, at most `req.concurrency` at a
    /// time. Per-identity failures land in the report. Cancelling `ctx`
    /// aborts the remaining calls; the report is still returned with
    /// `cancelled` set and the changes made before the abort.
    pub async fn reconcile(
        &self,
        ctx: &CancellationToken,
        req: ReconcileRequest,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::new(req.action, req.dry_run);
        info!(
            run_id = %report.run_id,
            action = %req.action,
            dry_run = req.dry_run,
            identities = req.identities.len(),
            "starting reconcile"
        );

        for identity in &req.identities {
            identity.validate()?;
        }

        let permits = Arc::new(Semaphore::new(req.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (index, identity) in req.identities.into_iter().enumerate() {
            let this = self.clone();
            let ctx = ctx.clone();
            let permits = permits.clone();
            let action = req.action;
            let dry_run = req.dry_run;
            tasks.spawn(async move {
                let mut changes = Vec::new();
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => match action {
                        Action::Provision => this.provision(&ctx, &identity, dry_run, &mut changes).await,
                        Action::Teardown => this.teardown(&ctx, &identity, dry_run, &mut changes).await,
                    },
                    Err(e) => Err(ReconcileError::Internal(e.to_string())),
                };
                (index, identity.display_name, changes, result)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.map_err(|e| ReconcileError::Internal(e.to_string()))?);
        }
        outcomes.sort_by_key(|(index, ..)| *index);

        report.cancelled = ctx.is_cancelled();
        for (_, display_name, changes, result) in outcomes {
            report.changes.extend(changes);
            if let Err(e) = result {
                warn!(display_name = %display_name, error = %e, "identity failed");
                report.errors.push(IdentityFailure { display_name, error: e.to_string() });
            }
        }
        if report.cancelled {
            warn!(
                run_id = %report.run_id,
                performed = report.changes.iter().filter(|c| c.is_mutation()).count(),
                "reconcile cancelled"
            );
        }

        report.finished_at = Some(Utc::now());
        info!(
            run_id = %report.run_id,
            changes = report.changes.len(),
            errors = report.errors.len(),
            "reconcile finished"
        );
        Ok(report)
    }
}

fn planned_credential(display_name: &str, spec: &tether_domain::FederatedCredentialSpec) -> Change {
    Change::FederatedCredentialAdded {
        display_name: display_name.to_string(),
        name: spec.name.clone(),
        issuer: spec.issuer.clone(),
        subject: spec.subject.clone(),
        object_id: None,
    }
}
