use tether_domain::{Application, FederatedIdentityCredential, ServicePrincipal};
use tether_reconciler::{Change, ReconcileReport};

/// Render a list of changes as human-readable text.
pub fn render_changes(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "No changes.\n".to_string();
    }
    let mut out = String::new();
    for change in changes {
        let line = match change {
            Change::ApplicationCreated { display_name, object_id } => {
                format!("+ application {}{}", display_name, id_suffix(object_id.as_ref()))
            }
            Change::ApplicationUnchanged { display_name, object_id } => {
                format!("= application {} ({})", display_name, object_id)
            }
            Change::ApplicationDeleted { display_name, object_id } => {
                format!("- application {} ({})", display_name, object_id)
            }
            Change::ServicePrincipalCreated { display_name, object_id } => {
                format!("  + service principal {}{}", display_name, id_suffix(object_id.as_ref()))
            }
            Change::ServicePrincipalUnchanged { display_name, object_id } => {
                format!("  = service principal {} ({})", display_name, object_id)
            }
            Change::ServicePrincipalDeleted { display_name, object_id } => {
                format!("  - service principal {} ({})", display_name, object_id)
            }
            Change::FederatedCredentialAdded { display_name, name, subject, object_id, .. } => format!(
                "  + credential {}/{} [{}]{}",
                display_name,
                name,
                subject,
                id_suffix(object_id.as_ref())
            ),
            Change::FederatedCredentialUnchanged { display_name, name, object_id } => {
                format!("  = credential {}/{} ({})", display_name, name, object_id)
            }
            Change::FederatedCredentialDeleted { display_name, name, object_id } => {
                format!("  - credential {}/{} ({})", display_name, name, object_id)
            }
            Change::IdentityAbsent { display_name } => format!("= {} absent", display_name),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub fn render_report(report: &ReconcileReport) -> String {
    let mut out = format!(
        "{} run {}{}\n",
        report.action,
        report.run_id,
        if report.dry_run { " (dry run)" } else { "" }
    );
    out.push_str(&render_changes(&report.changes));
    for failure in &report.errors {
        out.push_str(&format!("! {}: {}\n", failure.display_name, failure.error));
    }
    if report.cancelled {
        out.push_str("! cancelled before every identity finished\n");
    }
    out
}

pub fn render_application(app: &Application) -> String {
    format!(
        "Application: {}\n  object id: {}\n  app id:    {}\n",
        app.display_name, app.object_id, app.app_id
    )
}

pub fn render_service_principal(sp: &ServicePrincipal) -> String {
    format!(
        "Service principal: {}\n  object id: {}\n  app id:    {}\n  tags:      {}\n",
        sp.display_name.as_deref().unwrap_or("-"),
        sp.object_id,
        sp.app_id,
        sp.tags.join(", ")
    )
}

pub fn render_credential(fic: &FederatedIdentityCredential) -> String {
    format!(
        "Federated credential: {}\n  object id: {}\n  issuer:    {}\n  subject:   {}\n  audiences: {}\n",
        fic.name,
        fic.object_id,
        fic.issuer,
        fic.subject,
        fic.audiences.join(", ")
    )
}

fn id_suffix(object_id: Option<&tether_domain::ObjectId>) -> String {
    match object_id {
        Some(id) => format!(" ({})", id),
        None => String::new(),
    }
}
