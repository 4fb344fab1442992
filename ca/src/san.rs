use std::net::IpAddr;

use rcgen::{CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyUsagePurpose, SanType};

use crate::error::CaError;

/// Subject Alternative Name request for one issuance: DNS names first, then
/// IP literals, each list keeping caller order. Built once per request and
/// consumed by [`apply_leaf_extensions`]; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanSpec {
    pub dns: Vec<String>,
    pub ip: Vec<String>,
}

impl SanSpec {
    /// Build from the CLI's comma-separated inputs.
    pub fn from_csv(dns: Option<&str>, ip: Option<&str>) -> Self {
        Self {
            dns: sanitize_csv(dns.unwrap_or_default()),
            ip: sanitize_csv(ip.unwrap_or_default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dns.is_empty() && self.ip.is_empty()
    }
}

/// Split on commas, trim whitespace, drop empty entries.
pub fn sanitize_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Stamp the fixed leaf extension set onto certificate params: the SAN
/// entries (DNS before IP), `basicConstraints=CA:false`, a critical
/// digitalSignature+keyEncipherment key usage, and serverAuth EKU.
///
/// A SAN extension with zero entries is never produced: when both lists are
/// empty the subject name becomes the single DNS entry.
pub fn apply_leaf_extensions(
    subject: &str,
    san: &SanSpec,
    params: &mut CertificateParams,
) -> Result<(), CaError> {
    let mut names = Vec::with_capacity(san.dns.len().max(1) + san.ip.len());

    if san.is_empty() {
        names.push(SanType::DnsName(subject.try_into().map_err(
            |e: rcgen::Error| CaError::InvalidRequest(format!("invalid DNS name {subject:?}: {e}")),
        )?));
    } else {
        for dns in &san.dns {
            names.push(SanType::DnsName(dns.as_str().try_into().map_err(
                |e: rcgen::Error| CaError::InvalidRequest(format!("invalid DNS name {dns:?}: {e}")),
            )?));
        }
        for ip in &san.ip {
            let addr: IpAddr = ip
                .parse()
                .map_err(|_| CaError::InvalidRequest(format!("invalid IP literal {ip:?}")))?;
            names.push(SanType::IpAddress(addr));
        }
    }

    params.subject_alt_names = names;
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    Ok(())
}
