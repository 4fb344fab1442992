use std::path::Path;

use labca::{Authority, CaConfig, CertStatus};

pub fn list(ca_dir: &Path) -> anyhow::Result<()> {
    let authority = Authority::open(CaConfig::new(ca_dir))?;

    let records = authority.records();
    if records.is_empty() {
        println!("No certificates issued yet.");
        return Ok(());
    }

    for record in records {
        let detail = match record.status {
            CertStatus::Valid => format!("expires {}", record.not_after.format("%Y-%m-%d")),
            CertStatus::Revoked => match (record.revoked_at, record.revocation_reason) {
                (Some(at), Some(reason)) => {
                    format!("revoked {} ({:?})", at.format("%Y-%m-%d"), reason)
                }
                _ => "revoked".to_string(),
            },
        };
        println!(
            "{:>8}  {:<8}  {:<32}  {}",
            record.serial,
            record.status.to_string(),
            record.subject,
            detail
        );
    }

    Ok(())
}
