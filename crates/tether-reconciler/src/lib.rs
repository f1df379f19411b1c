pub mod ensure;
pub mod error;
pub mod locks;
pub mod reconcile;
pub mod report;

pub use ensure::Ensured;
pub use error::ReconcileError;
pub use locks::CreationLocks;
pub use reconcile::Reconciler;
pub use report::{Action, Change, IdentityFailure, ReconcileReport, ReconcileRequest};
