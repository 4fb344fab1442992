use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use labca::{Authority, CaConfig, RevocationReason};

#[derive(Clone, Parser)]
#[command(group = clap::ArgGroup::new("target").required(true).multiple(false))]
pub struct RevokeParams {
    /// Path of the certificate artifact to revoke.
    #[clap(long, group = "target")]
    pub cert_file: Option<PathBuf>,

    /// Serial of the certificate to revoke.
    #[clap(long, group = "target")]
    pub serial: Option<u64>,

    #[clap(long, value_enum, default_value = "unspecified")]
    pub reason: RevocationReason,
}

pub fn revoke(ca_dir: &Path, params: RevokeParams) -> anyhow::Result<()> {
    let mut authority = Authority::open(CaConfig::new(ca_dir))?;
    let now = Utc::now();

    let record = match (params.cert_file, params.serial) {
        (Some(path), _) => authority.revoke_by_path(&path, params.reason, now)?,
        (None, Some(serial)) => authority.revoke_serial(serial, params.reason, now)?,
        (None, None) => anyhow::bail!("either --cert-file or --serial is required"),
    };

    println!(
        "Revoked serial {} (\"{}\"); run `labcactl crl` to publish",
        record.serial, record.subject
    );

    Ok(())
}
