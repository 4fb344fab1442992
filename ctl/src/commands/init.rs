use std::path::Path;

use clap::Parser;
use labca::{Authority, CaConfig, InitOutcome, KeyAlgorithm};

#[derive(Clone, Parser)]
pub struct InitParams {
    /// Common name of the root certificate.
    #[clap(long, default_value = "Lab CA")]
    pub subject: String,

    /// Organization name on the root certificate.
    #[clap(long, default_value = "Lab")]
    pub org: String,

    /// Root certificate validity in days.
    #[clap(long, default_value_t = 3650)]
    pub days: i64,

    #[clap(long, value_enum, default_value = "ecdsa-p256")]
    pub key_alg: KeyAlgorithm,
}

pub fn init(ca_dir: &Path, params: InitParams) -> anyhow::Result<()> {
    let mut config = CaConfig::new(ca_dir);
    config.root_subject = params.subject;
    config.organization = params.org;
    config.root_validity_days = params.days;
    config.key_alg = params.key_alg;

    match Authority::init(&config)? {
        InitOutcome::Created => println!(
            "Initialized CA \"{}\" at {}",
            config.root_subject,
            config.ca_dir.display()
        ),
        InitOutcome::AlreadyInitialized => println!(
            "CA already initialized at {}, nothing to do",
            config.ca_dir.display()
        ),
    }

    Ok(())
}
