use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::commands::{CrlParams, InitParams, IssueParams, RevokeParams};

mod commands;

#[derive(Parser)]
#[command(
    name = "labcactl",
    about = "File-backed certificate authority for lab networks"
)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    /// CA workspace directory.
    #[clap(long, env = "LABCA_DIR", default_value = "./labca", global = true)]
    ca_dir: PathBuf,
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// Create the root key, self-signed root certificate and empty index.
    Init(InitParams),
    /// Issue a leaf certificate signed by the root.
    Issue(IssueParams),
    /// Mark an issued certificate as revoked.
    Revoke(RevokeParams),
    /// Sign and publish a CRL over the revoked set.
    Crl(CrlParams),
    /// Show the root certificate, fingerprint and validity.
    Info,
    /// List every record in the certificate index.
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("labca=info,labcactl=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Init(params) => commands::init(&args.ca_dir, params),
        Command::Issue(params) => commands::issue(&args.ca_dir, params),
        Command::Revoke(params) => commands::revoke(&args.ca_dir, params),
        Command::Crl(params) => commands::crl(&args.ca_dir, params),
        Command::Info => commands::info(&args.ca_dir),
        Command::List => commands::list(&args.ca_dir),
    }
}
