use std::path::Path;

use clap::Parser;
use labca::{Authority, CaConfig, IssueRequest, SanSpec};

#[derive(Clone, Parser)]
pub struct IssueParams {
    /// Subject name, also the file stem of the key and certificate.
    #[clap(long)]
    pub name: String,

    /// Comma-separated DNS names for the SAN extension.
    #[clap(long)]
    pub dns: Option<String>,

    /// Comma-separated IP literals for the SAN extension.
    #[clap(long)]
    pub ip: Option<String>,

    /// Certificate validity in days (defaults to the workspace policy).
    #[clap(long)]
    pub days: Option<i64>,

    /// Overwrite an existing certificate for the same name.
    #[clap(long)]
    pub force: bool,

    /// Reuse the leaf key already on disk instead of generating a new one.
    #[clap(long)]
    pub reuse_key: bool,
}

pub fn issue(ca_dir: &Path, params: IssueParams) -> anyhow::Result<()> {
    let mut authority = Authority::open(CaConfig::new(ca_dir))?;

    let record = authority.issue(IssueRequest {
        name: params.name,
        san: SanSpec::from_csv(params.dns.as_deref(), params.ip.as_deref()),
        validity_days: params.days,
        force: params.force,
        reuse_key: params.reuse_key,
    })?;

    println!(
        "Issued serial {} for \"{}\" (expires {})",
        record.serial,
        record.subject,
        record.not_after.format("%Y-%m-%d")
    );
    println!("  certificate: {}", record.cert_path.display());

    Ok(())
}
