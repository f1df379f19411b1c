use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tether_directory::CloudEnvironment;

#[derive(Debug, Parser)]
#[command(
    name = "tether",
    about = "Provision directory applications, service principals and federated credentials from YAML",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Log line format.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Directory connection flags. These win over the file's `directory` section.
#[derive(Debug, Clone, Args)]
pub struct DirectoryArgs {
    #[arg(long, env = "AZURE_TENANT_ID", global = true)]
    pub tenant_id: Option<String>,

    /// Client credentials; without them the Azure CLI login is used.
    #[arg(long, env = "AZURE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "TETHER_CLOUD", global = true)]
    pub cloud: Option<CloudArg>,

    /// Graph endpoint override, e.g. a local proxy.
    #[arg(long, env = "TETHER_GRAPH_ENDPOINT", global = true)]
    pub graph_endpoint: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create whatever the file declares and is missing.
    Apply {
        /// Path to the identities file.
        file: PathBuf,

        /// Look up only; report what would change.
        #[arg(long)]
        dry_run: bool,

        /// Identities reconciled at once.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Delete the declared identities.
    Destroy {
        /// Path to the identities file.
        file: PathBuf,

        /// Confirm deletion.
        #[arg(long)]
        yes: bool,

        #[arg(long)]
        dry_run: bool,

        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Look up a single directory object.
    Get {
        #[command(subcommand)]
        object: GetCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum GetCommand {
    /// Application by display name.
    Application { display_name: String },

    /// Service principal by display name.
    ServicePrincipal { display_name: String },

    /// Federated credential of an application by issuer and subject.
    Credential {
        /// Object ID of the owning application.
        application_object_id: String,

        #[arg(long)]
        issuer: String,

        #[arg(long)]
        subject: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CloudArg {
    Public,
    Usgov,
    China,
}

impl From<CloudArg> for CloudEnvironment {
    fn from(arg: CloudArg) -> Self {
        match arg {
            CloudArg::Public => CloudEnvironment::Public,
            CloudArg::Usgov => CloudEnvironment::UsGov,
            CloudArg::China => CloudEnvironment::China,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
