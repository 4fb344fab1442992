use std::path::Path;

use labca::{Authority, CaConfig};

pub fn info(ca_dir: &Path) -> anyhow::Result<()> {
    let authority = Authority::open(CaConfig::new(ca_dir))?;
    let info = authority.info()?;

    println!("Fingerprint: {}", info.fingerprint);
    println!(
        "Valid from {} until {}",
        info.not_before.format("%Y-%m-%d"),
        info.not_after.format("%Y-%m-%d")
    );
    print!("{}", info.cert_pem);

    Ok(())
}
