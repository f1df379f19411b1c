use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_domain::{ObjectId, WorkloadIdentity};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Provision,
    Teardown,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Provision => write!(f, "provision"),
            Action::Teardown => write!(f, "teardown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub identities: Vec<WorkloadIdentity>,
    pub action: Action,
    pub dry_run: bool,
    /// Identities processed at once.
    pub concurrency: usize,
}

impl ReconcileRequest {
    pub fn new(identities: Vec<WorkloadIdentity>, action: Action) -> Self {
        Self { identities, action, dry_run: false, concurrency: 4 }
    }
}

/// One observed or performed step. Object IDs are `None` for creations
/// planned by a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    ApplicationCreated { display_name: String, object_id: Option<ObjectId> },
    ApplicationUnchanged { display_name: String, object_id: ObjectId },
    ApplicationDeleted { display_name: String, object_id: ObjectId },
    ServicePrincipalCreated { display_name: String, object_id: Option<ObjectId> },
    ServicePrincipalUnchanged { display_name: String, object_id: ObjectId },
    ServicePrincipalDeleted { display_name: String, object_id: ObjectId },
    FederatedCredentialAdded {
        display_name: String,
        name: String,
        issuer: String,
        subject: String,
        object_id: Option<ObjectId>,
    },
    FederatedCredentialUnchanged { display_name: String, name: String, object_id: ObjectId },
    FederatedCredentialDeleted { display_name: String, name: String, object_id: ObjectId },
    /// Teardown found no application with this name.
    IdentityAbsent { display_name: String },
}

impl Change {
    /// True when the step creates or deletes something.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Change::ApplicationUnchanged { .. }
                | Change::ServicePrincipalUnchanged { .. }
                | Change::FederatedCredentialUnchanged { .. }
                | Change::IdentityAbsent { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFailure {
    pub display_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub action: Action,
    pub dry_run: bool,
    /// The run was cancelled before every identity finished.
    #[serde(default)]
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub changes: Vec<Change>,
    pub errors: Vec<IdentityFailure>,
}

impl ReconcileReport {
    pub fn new(action: Action, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            action,
            dry_run,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
            changes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}
