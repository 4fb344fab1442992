use std::path::Path;

use chrono::Utc;
use clap::Parser;
use labca::{Authority, CaConfig};

#[derive(Clone, Parser)]
pub struct CrlParams {
    /// Omit revoked certificates whose validity has already ended.
    #[clap(long)]
    pub prune_expired: bool,
}

pub fn crl(ca_dir: &Path, params: CrlParams) -> anyhow::Result<()> {
    let mut authority = Authority::open(CaConfig::new(ca_dir))?;

    let crl = authority.generate_crl(Utc::now(), params.prune_expired)?;

    println!(
        "Wrote CRL number {} with {} entries to {}",
        crl.number,
        crl.entries,
        authority.config().crl_path().display()
    );
    println!(
        "  next update: {}",
        crl.next_update.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}
