//! # keystorectl
//!
//! Command-line interface for the Serving Cert Keystore Controller.
//!
//! ## Usage
//!
//! ```bash
//! # Show annotations, target secret and keystore state of a Service
//! keystorectl status svc-a -n payments
//!
//! # Run one synchronization for a Service right now
//! keystorectl reconcile svc-a -n payments
//!
//! # Opt a Service in (sets both annotations)
//! keystorectl enable svc-a --secret svc-a-tls -n payments
//!
//! # Ask the controller to remove the keystore again
//! keystorectl disable svc-a -n payments
//!
//! # Build a keystore offline from PEM files
//! keystorectl encode --cert tls.crt --key tls.key --out tls.p12 --password-out tls-pkcs12-password
//!
//! # Decode a keystore offline
//! keystorectl inspect --keystore tls.p12 --password-file tls-pkcs12-password
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kube::Client;
use std::path::PathBuf;

mod annotate;
mod encode;
mod reconcile;
mod status;

/// Serving Cert Keystore Controller CLI
#[derive(Parser)]
#[command(name = "keystorectl")]
#[command(
    about = "Serving Cert Keystore Controller CLI",
    long_about = None,
    after_help = "\
Examples:
  keystorectl status svc-a --namespace payments
  keystorectl enable svc-a --secret svc-a-tls
  keystorectl inspect --keystore tls.p12 --password-file tls-pkcs12-password
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace
    #[arg(short, long, global = true, default_value = "default")]
    namespace: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show annotations, target secret and keystore state of a Service
    Status {
        /// Name of the Service
        #[arg(value_name = "SERVICE")]
        service: String,
    },
    /// Synchronize the keystore of a Service once, from this machine
    Reconcile {
        /// Name of the Service
        #[arg(value_name = "SERVICE")]
        service: String,
    },
    /// Annotate a Service so the controller maintains a keystore for it
    Enable {
        /// Name of the Service
        #[arg(value_name = "SERVICE")]
        service: String,

        /// Serving-cert secret the service CA writes for this Service
        #[arg(long)]
        secret: String,
    },
    /// Set the keystore flag of a Service to false
    Disable {
        /// Name of the Service
        #[arg(value_name = "SERVICE")]
        service: String,
    },
    /// Build a PKCS#12 keystore from PEM files
    Encode {
        /// PEM certificate
        #[arg(long)]
        cert: PathBuf,

        /// PEM RSA private key
        #[arg(long)]
        key: PathBuf,

        /// Where to write the keystore
        #[arg(long)]
        out: PathBuf,

        /// Where to write the generated password (printed to stdout when omitted)
        #[arg(long)]
        password_out: Option<PathBuf>,
    },
    /// Decode a PKCS#12 keystore and print what it contains
    Inspect {
        /// Keystore file
        #[arg(long)]
        keystore: PathBuf,

        #[command(flatten)]
        password: PasswordSource,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PasswordSource {
    /// Keystore password
    #[arg(long)]
    password: Option<String>,

    /// File holding the keystore password
    #[arg(long)]
    password_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any rustls client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|existing| {
            anyhow::anyhow!("Failed to install rustls crypto provider, one is already set: {existing:?}")
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystorectl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { service } => {
            status::status_command(client().await?, &service, &cli.namespace).await
        }
        Commands::Reconcile { service } => {
            reconcile::reconcile_command(client().await?, &service, &cli.namespace).await
        }
        Commands::Enable { service, secret } => {
            annotate::enable_command(client().await?, &service, &cli.namespace, &secret).await
        }
        Commands::Disable { service } => {
            annotate::disable_command(client().await?, &service, &cli.namespace).await
        }
        Commands::Encode {
            cert,
            key,
            out,
            password_out,
        } => encode::encode_command(&cert, &key, &out, password_out.as_deref()),
        Commands::Inspect { keystore, password } => {
            let password = match (password.password, password.password_file) {
                (Some(password), _) => password,
                (None, Some(path)) => encode::read_password_file(&path)?,
                (None, None) => anyhow::bail!("--password or --password-file is required"),
            };
            encode::inspect_command(&keystore, &password)
        }
    }
}

async fn client() -> Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")
}
