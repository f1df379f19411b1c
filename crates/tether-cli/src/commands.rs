use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tether_config::DirectorySettings;
use tether_directory::{CancellationToken, CloudEnvironment, Directory, DirectoryConfig, GraphDirectory};
use tether_domain::ObjectId;
use tether_reconciler::{Action, ReconcileReport, ReconcileRequest, Reconciler};

use crate::cli::{DirectoryArgs, GetCommand, OutputFormat};
use crate::output;

// ── Apply / Destroy ───────────────────────────────────────────────────────────

pub async fn apply(
    ctx: &CancellationToken,
    args: &DirectoryArgs,
    format: OutputFormat,
    file: PathBuf,
    dry_run: bool,
    concurrency: usize,
) -> Result<bool> {
    run(ctx, args, format, file, Action::Provision, dry_run, concurrency).await
}

pub async fn destroy(
    ctx: &CancellationToken,
    args: &DirectoryArgs,
    format: OutputFormat,
    file: PathBuf,
    yes: bool,
    dry_run: bool,
    concurrency: usize,
) -> Result<bool> {
    if !yes && !dry_run {
        anyhow::bail!("destroy deletes directory objects; pass --yes to confirm");
    }
    run(ctx, args, format, file, Action::Teardown, dry_run, concurrency).await
}

async fn run(
    ctx: &CancellationToken,
    args: &DirectoryArgs,
    format: OutputFormat,
    file: PathBuf,
    action: Action,
    dry_run: bool,
    concurrency: usize,
) -> Result<bool> {
    let config = tether_config::load_file(&file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let directory = connect(args, &config.directory)?;

    let mut req = ReconcileRequest::new(config.identities, action);
    req.dry_run = dry_run;
    req.concurrency = concurrency;

    let report = Reconciler::new(directory)
        .reconcile(ctx, req)
        .await
        .with_context(|| format!("{} aborted", action))?;
    print_report(&report, format)?;
    Ok(report.is_clean())
}

fn print_report(report: &ReconcileReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print!("{}", output::render_report(report)),
    }
    Ok(())
}

// ── Get ───────────────────────────────────────────────────────────────────────

pub async fn get(
    ctx: &CancellationToken,
    args: &DirectoryArgs,
    format: OutputFormat,
    object: GetCommand,
) -> Result<()> {
    let directory = connect(args, &DirectorySettings::default())?;
    match object {
        GetCommand::Application { display_name } => {
            let app = directory
                .get_application(ctx, &display_name)
                .await
                .with_context(|| format!("Failed to get application '{display_name}'"))?;
            print_object(&app, format, || output::render_application(&app))
        }
        GetCommand::ServicePrincipal { display_name } => {
            let sp = directory
                .get_service_principal(ctx, &display_name)
                .await
                .with_context(|| format!("Failed to get service principal '{display_name}'"))?;
            print_object(&sp, format, || output::render_service_principal(&sp))
        }
        GetCommand::Credential { application_object_id, issuer, subject } => {
            let fic = directory
                .get_federated_credential(ctx, &ObjectId::new(application_object_id), &issuer, &subject)
                .await
                .context("Failed to get federated credential")?;
            print_object(&fic, format, || output::render_credential(&fic))
        }
    }
}

fn print_object<T: Serialize>(value: &T, format: OutputFormat, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn connect(args: &DirectoryArgs, settings: &DirectorySettings) -> Result<Arc<dyn Directory>> {
    let config = directory_config(args, settings)?;
    Ok(Arc::new(GraphDirectory::from_config(&config)))
}

/// Flags first, then the file's `directory` section.
fn directory_config(args: &DirectoryArgs, settings: &DirectorySettings) -> Result<DirectoryConfig> {
    let tenant_id = args
        .tenant_id
        .clone()
        .or_else(|| settings.tenant_id.clone())
        .context("--tenant-id (or AZURE_TENANT_ID, or directory.tenant_id in the file) is required")?;

    let mut config = DirectoryConfig::new(tenant_id);
    if let Some(cloud) = args.cloud.map(CloudEnvironment::from).or(settings.cloud) {
        config.cloud = cloud;
    }
    config.graph_endpoint = args.graph_endpoint.clone();
    config.client_id = args.client_id.clone();
    config.client_secret = args.client_secret.clone();
    Ok(config)
}
